use serde::{Deserialize, Serialize};

/// European emission norms (Euro 1 through Euro 7).
///
/// `euro_6d_temp` and `euro_6d` are Euro 6 sub-categories with stricter test
/// cycles; for bracket lookups they all map to the numeric value 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EuroNorm {
    Euro1,
    Euro2,
    Euro3,
    Euro4,
    Euro5,
    Euro6,
    Euro6dTemp,
    Euro6d,
    Euro7,
}

impl EuroNorm {
    pub const ALL: [EuroNorm; 9] = [
        EuroNorm::Euro1,
        EuroNorm::Euro2,
        EuroNorm::Euro3,
        EuroNorm::Euro4,
        EuroNorm::Euro5,
        EuroNorm::Euro6,
        EuroNorm::Euro6dTemp,
        EuroNorm::Euro6d,
        EuroNorm::Euro7,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            EuroNorm::Euro1 => "euro_1",
            EuroNorm::Euro2 => "euro_2",
            EuroNorm::Euro3 => "euro_3",
            EuroNorm::Euro4 => "euro_4",
            EuroNorm::Euro5 => "euro_5",
            EuroNorm::Euro6 => "euro_6",
            EuroNorm::Euro6dTemp => "euro_6d_temp",
            EuroNorm::Euro6d => "euro_6d",
            EuroNorm::Euro7 => "euro_7",
        }
    }

    pub fn parse(code: &str) -> Option<EuroNorm> {
        EuroNorm::ALL.into_iter().find(|norm| norm.code() == code)
    }

    /// Numeric value used as the lookup key in air-quality bracket tables.
    pub fn numeric_value(&self) -> i32 {
        match self {
            EuroNorm::Euro1 => 1,
            EuroNorm::Euro2 => 2,
            EuroNorm::Euro3 => 3,
            EuroNorm::Euro4 => 4,
            EuroNorm::Euro5 => 5,
            EuroNorm::Euro6 | EuroNorm::Euro6dTemp | EuroNorm::Euro6d => 6,
            EuroNorm::Euro7 => 7,
        }
    }
}

impl std::fmt::Display for EuroNorm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_roundtrips_every_code() {
        for norm in EuroNorm::ALL {
            assert_eq!(EuroNorm::parse(norm.code()), Some(norm));
        }
    }

    #[test]
    fn euro_6_subcategories_share_numeric_value() {
        assert_eq!(EuroNorm::Euro6.numeric_value(), 6);
        assert_eq!(EuroNorm::Euro6dTemp.numeric_value(), 6);
        assert_eq!(EuroNorm::Euro6d.numeric_value(), 6);
    }

    #[test]
    fn numeric_values_are_ordered() {
        assert_eq!(EuroNorm::Euro1.numeric_value(), 1);
        assert_eq!(EuroNorm::Euro7.numeric_value(), 7);
    }
}
