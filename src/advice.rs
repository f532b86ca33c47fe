//! Map weather readings to health tips.

use serde::{Deserialize, Serialize};

/// At or above this temperature (°C) heat tips are given.
pub const HOT_TEMPERATURE: f64 = 35.0;
/// At or below this temperature (°C) cold tips are given.
pub const COLD_TEMPERATURE: f64 = 10.0;
/// Above this relative humidity (%) humidity tips are given.
pub const HUMID: f64 = 80.0;
/// Below this relative humidity (%) dry-air tips are given.
pub const DRY: f64 = 30.0;

/// Kind of health tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tip {
    Heat,
    Cold,
    Moderate,
    HighHumidity,
    DryAir,
    Rain,
    Snow,
    Sun,
    AirQuality,
}

impl Tip {
    /// Short advice displayed after a weather check.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Heat => "Temperature is high! Stay hydrated and avoid direct sunlight.",
            Self::Cold => "Temperature is low! Wear warm clothes.",
            Self::Moderate => "Temperature is comfortable. Have a nice day!",
            Self::HighHumidity => "High humidity detected! Stay cool and hydrated.",
            Self::DryAir => "Low humidity! Consider using moisturizer or staying hydrated.",
            Self::Rain => "Rain expected! Carry an umbrella and avoid standing water.",
            Self::Snow => "Snow expected! Wear insulated shoes and watch for icy paths.",
            Self::Sun => "Strong sun! Use sunscreen and wear sunglasses.",
            Self::AirQuality => "Poor air quality! Wear a mask outdoors.",
        }
    }

    /// Longer guidance used in alert bodies.
    pub fn detail(&self) -> &'static str {
        match self {
            Self::Heat => "High temperature: Stay in shade, avoid strenuous outdoor exercise between 11am-4pm, drink extra water (at least 3-4 liters), and consider electrolyte drinks if active.",
            Self::Cold => "Low temperature: Wear layered clothing, limit exposure to cold, and keep warm indoors to avoid hypothermia or flu risk.",
            Self::Moderate => "Moderate temperature: Maintain normal activity but stay hydrated and take breaks in shade if outdoors.",
            Self::HighHumidity => "High humidity: Body cooling is less efficient. Avoid heavy exertion outside; indoor cooling or fans help.",
            Self::DryAir => "Low humidity: Skin and nasal passages may dry. Use moisturizers and drink water frequently.",
            Self::Rain => "Rain expected: carry an umbrella, wear water-resistant clothing, avoid standing water to prevent infections.",
            Self::Snow => "Snow expected: wear insulated, waterproof footwear, cover extremities and walk carefully on icy surfaces.",
            Self::Sun => "Sun/UV: Use sunscreen (SPF 30+), wear sunglasses and hats during peak sunlight hours.",
            Self::AirQuality => "Poor air quality: Use N95 masks outdoors, limit outdoor activities, and keep windows closed.",
        }
    }
}

/// A tip as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    pub kind: Tip,
    pub message: String,
}

impl From<Tip> for Advice {
    fn from(kind: Tip) -> Self {
        Self {
            kind,
            message: kind.message().to_owned(),
        }
    }
}

/// Ordered tips for a reading: temperature first, then humidity, then
/// condition.
pub fn tips(temperature: f64, humidity: f64, condition: &str) -> Vec<Tip> {
    let mut tips = Vec::with_capacity(4);

    tips.push(if temperature >= HOT_TEMPERATURE {
        Tip::Heat
    } else if temperature <= COLD_TEMPERATURE {
        Tip::Cold
    } else {
        Tip::Moderate
    });

    if humidity > HUMID {
        tips.push(Tip::HighHumidity);
    } else if humidity < DRY {
        tips.push(Tip::DryAir);
    }

    let condition = condition.to_lowercase();
    if condition.contains("rain") {
        tips.push(Tip::Rain);
    }
    if condition.contains("snow") {
        tips.push(Tip::Snow);
    }
    if condition.contains("clear") || condition.contains("sun") {
        tips.push(Tip::Sun);
    }
    if ["haze", "smog", "dust"].iter().any(|c| condition.contains(c)) {
        tips.push(Tip::AirQuality);
    }

    tips
}

/// Same as [`tips`] with display messages.
pub fn advise(temperature: f64, humidity: f64, condition: &str) -> Vec<Advice> {
    tips(temperature, humidity, condition)
        .into_iter()
        .map(Advice::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_always_one_entry() {
        for tenth in -300..=500 {
            let temperature = tenth as f64 / 10.0;
            let tips = tips(temperature, 50.0, "overcast clouds");
            let expected = if temperature >= 35.0 {
                Tip::Heat
            } else if temperature <= 10.0 {
                Tip::Cold
            } else {
                Tip::Moderate
            };
            assert_eq!(tips, vec![expected], "temperature {temperature}");
        }
    }

    #[test]
    fn test_humidity() {
        for humidity in 0..=100 {
            let tips = tips(20.0, humidity as f64, "");
            assert_eq!(tips.contains(&Tip::HighHumidity), humidity > 80);
            assert_eq!(tips.contains(&Tip::DryAir), humidity < 30);
        }
    }

    #[test]
    fn test_hot_humid_rain() {
        assert_eq!(
            tips(36.0, 85.0, "light rain"),
            vec![Tip::Heat, Tip::HighHumidity, Tip::Rain]
        );
    }

    #[test]
    fn test_conditions() {
        assert_eq!(tips(0.0, 50.0, "Heavy SNOW"), vec![Tip::Cold, Tip::Snow]);
        assert_eq!(tips(20.0, 50.0, "clear sky"), vec![Tip::Moderate, Tip::Sun]);
        assert_eq!(tips(20.0, 50.0, "haze"), vec![Tip::Moderate, Tip::AirQuality]);
        assert_eq!(tips(20.0, 50.0, "dust"), vec![Tip::Moderate, Tip::AirQuality]);
        assert_eq!(
            tips(20.0, 50.0, "rain and snow"),
            vec![Tip::Moderate, Tip::Rain, Tip::Snow]
        );
    }

    #[test]
    fn test_advise_messages() {
        let advice = advise(36.0, 85.0, "light rain");
        assert_eq!(advice.len(), 3);
        assert_eq!(advice[0].kind, Tip::Heat);
        assert!(advice[0].message.contains("hydrated"));

        let json = serde_json::to_value(&advice[1]).unwrap();
        assert_eq!(json["kind"], "high_humidity");
    }
}
