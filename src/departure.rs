/*
 *  departure.rs
 *
 *  departure-board - live departures on small matrix displays
 *  (c) 2020-26 Stuart Hunter
 *
 *  Normalized departure records and their display strings
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use serde::{Deserialize, Serialize};

/// One upcoming service, already normalized by whatever fetched it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Departure {
    pub destination_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_platform: Option<String>,
    /// scheduled time, or for TfL a ready-made "N mins"
    pub aimed_departure_time: String,
    /// "On time", "Delayed", "Cancelled" or an explicit HH:MM
    pub expected_departure_time: String,
    #[serde(default)]
    pub calling_at_list: String,
    #[serde(default)]
    pub is_tfl: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
}

/// "1st", "2nd", "3rd", "4th" ... for a 1-based position.
pub fn ordinal(pos: usize) -> String {
    let suffix = match (pos % 10, pos % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{pos}{suffix}")
}

impl Departure {
    /// Status column text.
    pub fn service_status(&self) -> String {
        match self.expected_departure_time.as_str() {
            "On time" => "On time".to_string(),
            "Cancelled" => "Cancelled".to_string(),
            "Delayed" => "Delayed".to_string(),
            expected if expected == self.aimed_departure_time => "On time".to_string(),
            expected => format!("Exp {expected}"),
        }
    }

    /// Platform column text, if the service has a platform at all.
    pub fn platform_label(&self) -> Option<String> {
        if let Some(display) = &self.display_platform {
            return Some(display.clone());
        }
        self.platform.as_ref().map(|p| {
            if p.eq_ignore_ascii_case("bus") {
                "BUS".to_string()
            } else {
                format!("Plat {p}")
            }
        })
    }

    /// Destination column text for the departure at 1-based `pos`.
    pub fn destination_label(&self, pos: usize, numbered: bool) -> String {
        match (self.is_tfl, numbered) {
            (true, true) => format!("{}  {}", ordinal(pos), self.destination_name),
            (true, false) => self.destination_name.clone(),
            (false, true) => format!(
                "{}  {}  {}",
                ordinal(pos),
                self.aimed_departure_time,
                self.destination_name
            ),
            (false, false) => format!("{}  {}", self.aimed_departure_time, self.destination_name),
        }
    }

    /// TfL arrivals carry their countdown in the aimed time.
    pub fn time_to_arrival(&self) -> &str {
        &self.aimed_departure_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rail(aimed: &str, expected: &str) -> Departure {
        Departure {
            destination_name: "London Paddington".into(),
            platform: Some("4".into()),
            aimed_departure_time: aimed.into(),
            expected_departure_time: expected.into(),
            calling_at_list: "Twyford and London Paddington".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_ordinals() {
        let got: Vec<String> = [1, 2, 3, 4, 11, 12, 13, 21, 22, 101].iter().map(|p| ordinal(*p)).collect();
        assert_eq!(got, ["1st", "2nd", "3rd", "4th", "11th", "12th", "13th", "21st", "22nd", "101st"]);
    }

    #[test]
    fn test_service_status() {
        assert_eq!(rail("10:15", "On time").service_status(), "On time");
        assert_eq!(rail("10:15", "Cancelled").service_status(), "Cancelled");
        assert_eq!(rail("10:15", "Delayed").service_status(), "Delayed");
        assert_eq!(rail("10:15", "10:21").service_status(), "Exp 10:21");
        assert_eq!(rail("10:15", "10:15").service_status(), "On time");
    }

    #[test]
    fn test_platform_label() {
        let mut d = rail("10:15", "On time");
        assert_eq!(d.platform_label().as_deref(), Some("Plat 4"));
        d.platform = Some("Bus".into());
        assert_eq!(d.platform_label().as_deref(), Some("BUS"));
        d.display_platform = Some("Platform 2".into());
        assert_eq!(d.platform_label().as_deref(), Some("Platform 2"));
        d.display_platform = None;
        d.platform = None;
        assert_eq!(d.platform_label(), None);
    }

    #[test]
    fn test_destination_labels() {
        let d = rail("10:15", "On time");
        assert_eq!(d.destination_label(1, true), "1st  10:15  London Paddington");
        assert_eq!(d.destination_label(2, false), "10:15  London Paddington");
        let tfl = Departure { is_tfl: true, aimed_departure_time: "3 mins".into(), ..d };
        assert_eq!(tfl.destination_label(3, true), "3rd  London Paddington");
        assert_eq!(tfl.destination_label(3, false), "London Paddington");
        assert_eq!(tfl.time_to_arrival(), "3 mins");
    }

    #[test]
    fn test_yaml_record() {
        let yaml = "destination_name: Reading\naimed_departure_time: '10:15'\nexpected_departure_time: On time\n";
        let d: Departure = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(d.destination_name, "Reading");
        assert!(!d.is_tfl);
        assert_eq!(d.calling_at_list, "");
        assert_eq!(d.platform_label(), None);
    }
}
