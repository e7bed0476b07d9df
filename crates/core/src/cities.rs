//! City list and slug derivation.
//!
//! The embedded list holds the provincial capitals and special
//! administrative regions used when a trigger supplies no city. Slugs are
//! filesystem/URL-safe romanizations used in blob keys; lookup falls back
//! to a normalize rule for cities outside the table.

use rand::seq::IndexedRandom;

/// Cities eligible for the scheduled random draw.
pub const CITIES: &[&str] = &[
    "北京市",
    "天津市",
    "上海市",
    "重庆市",
    "石家庄市",
    "太原市",
    "呼和浩特市",
    "沈阳市",
    "长春市",
    "哈尔滨市",
    "南京市",
    "杭州市",
    "合肥市",
    "福州市",
    "南昌市",
    "济南市",
    "郑州市",
    "武汉市",
    "长沙市",
    "广州市",
    "南宁市",
    "海口市",
    "成都市",
    "贵阳市",
    "昆明市",
    "拉萨市",
    "西安市",
    "兰州市",
    "西宁市",
    "银川市",
    "乌鲁木齐市",
    "香港",
    "澳门",
    "台北市",
];

/// Static city → slug table. Keys use the official (suffixed) names;
/// a handful of non-mainland entries use their conventional romanization.
const SLUGS: &[(&str, &str)] = &[
    ("北京市", "beijing"),
    ("天津市", "tianjin"),
    ("上海市", "shanghai"),
    ("重庆市", "chongqing"),
    ("石家庄市", "shijiazhuang"),
    ("太原市", "taiyuan"),
    ("呼和浩特市", "huhehaote"),
    ("沈阳市", "shenyang"),
    ("长春市", "changchun"),
    ("哈尔滨市", "haerbin"),
    ("南京市", "nanjing"),
    ("杭州市", "hangzhou"),
    ("合肥市", "hefei"),
    ("福州市", "fuzhou"),
    ("南昌市", "nanchang"),
    ("济南市", "jinan"),
    ("郑州市", "zhengzhou"),
    ("武汉市", "wuhan"),
    ("长沙市", "changsha"),
    ("广州市", "guangzhou"),
    ("南宁市", "nanning"),
    ("海口市", "haikou"),
    ("成都市", "chengdu"),
    ("贵阳市", "guiyang"),
    ("昆明市", "kunming"),
    ("拉萨市", "lasa"),
    ("西安市", "xian"),
    ("兰州市", "lanzhou"),
    ("西宁市", "xining"),
    ("银川市", "yinchuan"),
    ("乌鲁木齐市", "wulumuqi"),
    ("香港", "xianggang"),
    ("澳门", "aomen"),
    ("台北市", "taibei"),
    ("東京", "tokyo"),
    ("大阪", "osaka"),
    ("京都", "kyoto"),
    ("横浜", "yokohama"),
    ("ソウル", "seoul"),
    ("釜山", "busan"),
];

/// Pick a city by uniform random draw from the embedded list.
pub fn pick_random_city() -> &'static str {
    CITIES
        .choose(&mut rand::rng())
        .expect("city list is non-empty")
}

/// Derive a filesystem/URL-safe slug for a city name.
///
/// Resolution order: exact table match, table match with a `市` suffix
/// appended, then the normalize fallback (lowercase, strip everything
/// outside `a-z0-9`). An empty fallback result yields `"unknown"`.
pub fn city_slug(city: &str) -> String {
    if let Some(slug) = lookup(city) {
        return slug.to_string();
    }

    let with_suffix = format!("{city}市");
    if let Some(slug) = lookup(&with_suffix) {
        return slug.to_string();
    }

    let normalized: String = city
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    if normalized.is_empty() {
        "unknown".to_string()
    } else {
        normalized
    }
}

fn lookup(city: &str) -> Option<&'static str> {
    SLUGS
        .iter()
        .find(|(name, _)| *name == city)
        .map(|(_, slug)| *slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_table_match() {
        assert_eq!(city_slug("杭州市"), "hangzhou");
        assert_eq!(city_slug("香港"), "xianggang");
    }

    #[test]
    fn suffix_retry_match() {
        // Users and the manual trigger commonly omit the 市 suffix.
        assert_eq!(city_slug("杭州"), "hangzhou");
        assert_eq!(city_slug("北京"), "beijing");
    }

    #[test]
    fn ascii_fallback() {
        assert_eq!(city_slug("New York"), "newyork");
        assert_eq!(city_slug("Tokyo"), "tokyo");
    }

    #[test]
    fn non_ascii_without_entry_falls_back_to_unknown() {
        assert_eq!(city_slug("未知城"), "unknown");
    }

    #[test]
    fn empty_input_is_unknown() {
        assert_eq!(city_slug(""), "unknown");
    }

    #[test]
    fn random_pick_is_from_the_list() {
        for _ in 0..20 {
            let city = pick_random_city();
            assert!(CITIES.contains(&city));
        }
    }

    #[test]
    fn every_listed_city_has_a_table_slug() {
        for city in CITIES {
            let slug = city_slug(city);
            assert_ne!(slug, "unknown", "missing slug for {city}");
        }
    }
}
