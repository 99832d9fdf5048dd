//! JSON mode support for structured output.
//!
//! Defines how much JSON structure the engine expects from the model and how
//! that expectation is communicated to the chat service.

/// JSON mode options for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JsonMode {
    /// Raw text; the accumulated answer is the candidate value.
    #[default]
    Off,

    /// Any JSON value. The service is not asked for JSON itself: the caller's
    /// grammar is what constrains the output, so a grammar is required.
    Any,

    /// A JSON object, requested natively from the service (`format: "json"`).
    /// Mutually exclusive with a grammar.
    Object,
}

impl JsonMode {
    /// Get the string representation used in options and config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonMode::Off => "off",
            JsonMode::Any => "any",
            JsonMode::Object => "object",
        }
    }

    /// Whether the accumulated text must parse as JSON.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, JsonMode::Off)
    }

    /// Value of the service's native `format` field, if this mode uses one.
    pub fn service_format(&self) -> Option<&'static str> {
        match self {
            JsonMode::Object => Some("json"),
            JsonMode::Off | JsonMode::Any => None,
        }
    }
}

impl std::fmt::Display for JsonMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JsonMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" | "false" | "" => Ok(JsonMode::Off),
            "any" => Ok(JsonMode::Any),
            "object" | "json_object" => Ok(JsonMode::Object),
            _ => Err(format!("Unknown JSON mode: {}", s)),
        }
    }
}

impl From<bool> for JsonMode {
    /// `true` maps to [`JsonMode::Object`], the only mode usable without a grammar.
    fn from(enabled: bool) -> Self {
        if enabled {
            JsonMode::Object
        } else {
            JsonMode::Off
        }
    }
}

impl serde::Serialize for JsonMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for JsonMode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(b) => Ok(JsonMode::from(b)),
            Raw::Name(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}
