use std::fmt::Display;

/// Decade bands used to cross-tabulate answers by participant age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AgeBand {
    Tens,
    Twenties,
    Thirties,
    Forties,
    FiftiesPlus,
}

impl AgeBand {
    /// Every band, in display order.
    pub const ALL: [AgeBand; 5] = [
        AgeBand::Tens,
        AgeBand::Twenties,
        AgeBand::Thirties,
        AgeBand::Forties,
        AgeBand::FiftiesPlus,
    ];

    /// The band a given age falls into.
    pub fn of(age: u32) -> AgeBand {
        match age {
            0..=19 => AgeBand::Tens,
            20..=29 => AgeBand::Twenties,
            30..=39 => AgeBand::Thirties,
            40..=49 => AgeBand::Forties,
            _ => AgeBand::FiftiesPlus,
        }
    }

    /// The label used in chart series.
    pub fn label(self) -> &'static str {
        match self {
            AgeBand::Tens => "10s",
            AgeBand::Twenties => "20s",
            AgeBand::Thirties => "30s",
            AgeBand::Forties => "40s",
            AgeBand::FiftiesPlus => "50s+",
        }
    }
}

impl Display for AgeBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_boundaries() {
        assert_eq!(AgeBand::of(0).label(), "10s");
        assert_eq!(AgeBand::of(19).label(), "10s");
        assert_eq!(AgeBand::of(20).label(), "20s");
        assert_eq!(AgeBand::of(29).label(), "20s");
        assert_eq!(AgeBand::of(30).label(), "30s");
        assert_eq!(AgeBand::of(49).label(), "40s");
        assert_eq!(AgeBand::of(50).label(), "50s+");
        assert_eq!(AgeBand::of(93).label(), "50s+");
    }
}
