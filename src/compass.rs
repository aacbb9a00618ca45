use serde::Serialize;
use std::fmt;

/// Shown wherever a direction is unknown.
pub const PLACEHOLDER: &str = "—";

/// The eight principal winds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompassPoint {
    North,
    Northeast,
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
}

impl CompassPoint {
    const ALL: [CompassPoint; 8] = [
        CompassPoint::North,
        CompassPoint::Northeast,
        CompassPoint::East,
        CompassPoint::Southeast,
        CompassPoint::South,
        CompassPoint::Southwest,
        CompassPoint::West,
        CompassPoint::Northwest,
    ];

    /// Nearest of the eight points, each covering a 45° sector centred on it.
    pub fn from_degrees(degrees: f64) -> Option<Self> {
        if !degrees.is_finite() {
            return None;
        }
        let sector = (degrees / 45.0 + 0.5).floor() as i64;
        Some(Self::ALL[sector.rem_euclid(8) as usize])
    }

    pub fn as_word(&self) -> &'static str {
        match self {
            CompassPoint::North => "North",
            CompassPoint::Northeast => "Northeast",
            CompassPoint::East => "East",
            CompassPoint::Southeast => "Southeast",
            CompassPoint::South => "South",
            CompassPoint::Southwest => "Southwest",
            CompassPoint::West => "West",
            CompassPoint::Northwest => "Northwest",
        }
    }
}

impl fmt::Display for CompassPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_word())
    }
}

pub fn direction_to_compass_word(degrees: Option<f64>) -> &'static str {
    degrees
        .and_then(CompassPoint::from_degrees)
        .map_or(PLACEHOLDER, |point| point.as_word())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_words() {
        assert_eq!(direction_to_compass_word(Some(0.0)), "North");
        assert_eq!(direction_to_compass_word(Some(22.0)), "North");
        assert_eq!(direction_to_compass_word(Some(44.0)), "Northeast");
        assert_eq!(direction_to_compass_word(Some(46.0)), "Northeast");
        assert_eq!(direction_to_compass_word(Some(359.0)), "North");
        assert_eq!(direction_to_compass_word(Some(90.0)), "East");
        assert_eq!(direction_to_compass_word(Some(225.0)), "Southwest");
        assert_eq!(direction_to_compass_word(Some(300.0)), "Northwest");
    }

    #[test]
    fn test_sector_boundary_rounds_up() {
        assert_eq!(direction_to_compass_word(Some(22.5)), "Northeast");
        assert_eq!(direction_to_compass_word(Some(337.5)), "North");
    }

    #[test]
    fn test_unknown_direction_is_placeholder() {
        assert_eq!(direction_to_compass_word(None), PLACEHOLDER);
        assert_eq!(direction_to_compass_word(Some(f64::NAN)), PLACEHOLDER);
    }

    #[test]
    fn test_out_of_range_degrees_wrap() {
        assert_eq!(CompassPoint::from_degrees(-90.0), Some(CompassPoint::West));
        assert_eq!(CompassPoint::from_degrees(450.0), Some(CompassPoint::East));
        assert_eq!(CompassPoint::South.to_string(), "South");
    }
}
