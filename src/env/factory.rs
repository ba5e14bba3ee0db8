use super::{CartPole, Environment, OpenGridworld};
use crate::error::ConfigError;

/// Builds registered environments by name.
pub struct EnvFactory;

impl EnvFactory {
    pub const REGISTERED: [&'static str; 3] = ["CartPole-v0", "CartPole-v1", "OpenGridworld-v0"];

    pub fn make(name: &str) -> Result<Box<dyn Environment>, ConfigError> {
        match name {
            "CartPole-v0" => Ok(Box::new(CartPole::v0())),
            "CartPole-v1" => Ok(Box::new(CartPole::v1())),
            "OpenGridworld-v0" => Ok(Box::new(OpenGridworld::v0())),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_registered() {
        for name in EnvFactory::REGISTERED {
            let env = EnvFactory::make(name).unwrap();
            assert_eq!(env.name(), name);
        }
    }

    #[test]
    fn test_make_unknown() {
        let err = EnvFactory::make("Pong-v4").err().unwrap();
        assert!(matches!(err, ConfigError::UnknownEnvironment(name) if name == "Pong-v4"));
    }
}
