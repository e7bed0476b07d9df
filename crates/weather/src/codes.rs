//! WMO weather-code → display condition mapping.

/// Human-readable condition for a WMO weather code: `(text, emoji icon)`.
///
/// Text is Chinese to match the card overlay language used for the
/// embedded city list.
pub fn condition_for_code(code: i32) -> (&'static str, &'static str) {
    match code {
        0 => ("晴", "☀️"),
        1..=3 => ("多云", "⛅"),
        45 | 48 => ("雾", "🌫️"),
        51..=57 => ("毛毛雨", "🌦️"),
        61..=67 => ("降雨", "🌧️"),
        71..=77 => ("降雪", "🌨️"),
        80..=82 => ("阵雨", "🌦️"),
        85..=86 => ("阵雪", "🌨️"),
        95 => ("雷暴", "⛈️"),
        96..=99 => ("强雷暴", "⛈️"),
        _ => ("未知天气", "❓"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_sky() {
        assert_eq!(condition_for_code(0), ("晴", "☀️"));
    }

    #[test]
    fn cloudy_band() {
        for code in 1..=3 {
            assert_eq!(condition_for_code(code).0, "多云");
        }
    }

    #[test]
    fn rain_and_snow_bands() {
        assert_eq!(condition_for_code(61).0, "降雨");
        assert_eq!(condition_for_code(67).0, "降雨");
        assert_eq!(condition_for_code(71).0, "降雪");
        assert_eq!(condition_for_code(82).0, "阵雨");
        assert_eq!(condition_for_code(86).0, "阵雪");
    }

    #[test]
    fn thunderstorms() {
        assert_eq!(condition_for_code(95).0, "雷暴");
        assert_eq!(condition_for_code(96).0, "强雷暴");
        assert_eq!(condition_for_code(99).0, "强雷暴");
    }

    #[test]
    fn unknown_codes_fall_back() {
        assert_eq!(condition_for_code(42), ("未知天气", "❓"));
        assert_eq!(condition_for_code(-1), ("未知天气", "❓"));
    }
}
