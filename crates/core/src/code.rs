//! Open mHealth observation codes

use std::fmt;

/// Coding system assumed for codes given without one
pub const OPEN_MHEALTH_SYSTEM: &str = "https://w3id.org/openmhealth";

/// Recognized Open mHealth schema codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    BloodPressure,
    BloodGlucose,
}

impl Code {
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::BloodPressure => "omh:blood-pressure:4.0",
            Code::BloodGlucose => "omh:blood-glucose:4.0",
        }
    }

    /// `system|code` form, ready for a FHIR `code` search parameter
    pub fn qualified(&self) -> String {
        qualify_code(self.as_str())
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.as_str().to_string()
    }
}

/// Qualify a code filter with its coding system.
///
/// A value already containing `|` is `system|code` and passes through;
/// a bare code gets the Open mHealth system.
pub fn qualify_code(code: &str) -> String {
    if code.contains('|') {
        code.to_string()
    } else {
        format!("{OPEN_MHEALTH_SYSTEM}|{code}")
    }
}
