/// Access to the controller device's own position.
pub mod location;

/// Relays start/stop intents to a speech engine and collects what it hears.
pub mod voice;
