use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const BUILTIN_PERSONAS: &str = include_str!("../assets/personas.json");
const BUILTIN_TOPICS: &str = include_str!("../assets/topics.json");

/// An AI debate participant. Immutable catalog entry; exactly two distinct
/// personas are active per session, chosen once at session start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub color: String,
    pub role: String,
    pub personality: String,
    pub style: String,
}

#[derive(Debug, Clone)]
pub struct PersonaCatalog {
    personas: Vec<Persona>,
}

impl PersonaCatalog {
    /// Load the catalog from a JSON file, or the builtin set when no path
    /// is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let raw = match path {
            Some(path) => std::fs::read_to_string(path)?,
            None => BUILTIN_PERSONAS.to_string(),
        };
        let personas: Vec<Persona> = serde_json::from_str(&raw)
            .map_err(|e| Error::Configuration(format!("invalid persona catalog: {e}")))?;
        if personas.len() < 2 {
            return Err(Error::Configuration(
                "persona catalog needs at least two entries".to_string(),
            ));
        }
        Ok(Self { personas })
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    /// Sample two distinct personas for a session.
    pub fn sample_pair<R: Rng>(&self, rng: &mut R) -> (Persona, Persona) {
        let mut picks = self.personas.choose_multiple(rng, 2);
        // choose_multiple yields exactly 2 items: len() >= 2 is checked at load.
        match (picks.next(), picks.next()) {
            (Some(a), Some(b)) => (a.clone(), b.clone()),
            _ => (self.personas[0].clone(), self.personas[1].clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TopicCatalog {
    topics: Vec<String>,
}

impl TopicCatalog {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let raw = match path {
            Some(path) => std::fs::read_to_string(path)?,
            None => BUILTIN_TOPICS.to_string(),
        };
        let topics: Vec<String> = serde_json::from_str(&raw)
            .map_err(|e| Error::Configuration(format!("invalid topic catalog: {e}")))?;
        if topics.is_empty() {
            return Err(Error::Configuration("topic catalog is empty".to_string()));
        }
        Ok(Self { topics })
    }

    pub fn into_topics(self) -> Vec<String> {
        self.topics
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
