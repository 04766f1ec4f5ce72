// src/extractors/period.rs
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static QUARTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Q([1-4])").expect("Failed to compile QUARTER_RE")
});

// Four digits are tried before two so "FY2024" is not read as "FY20".
static FISCAL_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)FY[-\s]?(\d{4}|\d{2})").expect("Failed to compile FISCAL_YEAR_RE")
});

/// Patterns used when annotating text in debug mode.
pub const DEBUG_PATTERNS: [(&str, &str); 2] = [
    (r"(?i)Q[1-4]", "quarter"),
    (r"(?i)FY[-\s]?(?:\d{4}|\d{2})", "fiscal_year"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            1 => Some(Quarter::Q1),
            2 => Some(Quarter::Q2),
            3 => Some(Quarter::Q3),
            4 => Some(Quarter::Q4),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 2,
            Quarter::Q3 => 3,
            Quarter::Q4 => 4,
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Fiscal quarter and year read out of model output. `None` means unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FiscalPeriod {
    pub quarter: Option<Quarter>,
    pub fiscal_year: Option<u16>,
}

impl FiscalPeriod {
    pub fn is_resolved(&self) -> bool {
        self.quarter.is_some() && self.fiscal_year.is_some()
    }
}

impl fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quarter {
            Some(q) => write!(f, "Q{}", q)?,
            None => write!(f, "Q?")?,
        }
        match self.fiscal_year {
            Some(y) => write!(f, " FY{}", y),
            None => write!(f, " FY?"),
        }
    }
}

/// Extracts the first quarter token and the first fiscal-year token.
/// Never fails: unmatched parts come back as `None`.
///
/// Two-digit years are read as 20xx, so "FY99" is 2099 rather than 1999.
pub fn parse_fiscal_period(text: &str) -> FiscalPeriod {
    let quarter = QUARTER_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u8>().ok())
        .and_then(Quarter::from_digit);

    let fiscal_year = FISCAL_YEAR_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| {
            let digits = m.as_str();
            let year = digits.parse::<u16>().ok()?;
            if digits.len() == 2 {
                Some(2000 + year)
            } else {
                Some(year)
            }
        });

    FiscalPeriod { quarter, fiscal_year }
}
