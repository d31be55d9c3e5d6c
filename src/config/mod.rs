/// Key/value property store over TOML
pub mod properties;
/// Agent-wide settings
pub mod settings;

pub use properties::Properties;
pub use settings::{AgentSettings, NotifierMode};
