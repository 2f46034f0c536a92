// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Read-only pose and routine catalog

use crate::error::{SessionError, SessionResult};
use serde::{Deserialize, Serialize};

/// A single pose. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asana {
    pub id: u32,
    pub name: String,
    pub sanskrit_name: String,
    pub image: String,
}

impl Asana {
    pub fn new(id: u32, name: &str, sanskrit_name: &str, image: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            sanskrit_name: sanskrit_name.to_string(),
            image: image.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

/// Ordered practice sequence. Order matches the backend's pose progression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub id: String,
    pub name: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub asanas: Vec<Asana>,
}

impl Routine {
    pub fn asana_ids(&self) -> Vec<u32> {
        self.asanas.iter().map(|a| a.id).collect()
    }

    pub fn asana(&self, id: u32) -> Option<&Asana> {
        self.asanas.iter().find(|a| a.id == id)
    }
}

/// The 12-pose sun salutation
pub fn surya_namaskar() -> Routine {
    Routine {
        id: "surya-namaskar".to_string(),
        name: "Surya Namaskar".to_string(),
        description: "A sequence of 12 yoga poses to greet the sun.".to_string(),
        difficulty: Difficulty::Intermediate,
        asanas: vec![
            Asana::new(1, "Pranamasana", "Prayer Pose", "/images/pranamasana.jpg"),
            Asana::new(2, "Hastauttanasana", "Raised Arms Pose", "/images/hastauttanasana.jpg"),
            Asana::new(3, "Hastapadasana", "Hand to Foot Pose", "/images/hastapadasana.jpg"),
            Asana::new(4, "Ashwa Sanchalanasana", "Equestrian Pose", "/images/ashwa-sanchalanasana.jpg"),
            Asana::new(5, "Dandasana", "Stick Pose", "/images/dandasana.jpg"),
            Asana::new(6, "Ashtanga Namaskara", "Eight-Limbed Salutation", "/images/ashtanga-namaskara.jpg"),
            Asana::new(7, "Bhujangasana", "Cobra Pose", "/images/bhujangasana.jpg"),
            Asana::new(8, "Adho Mukha Svanasana", "Downward-Facing Dog Pose", "/images/adho-mukha-svanasana.jpg"),
            Asana::new(9, "Ashwa Sanchalanasana", "Equestrian Pose", "/images/ashwa-sanchalanasana.jpg"),
            Asana::new(10, "Hastapadasana", "Hand to Foot Pose", "/images/hastapadasana.jpg"),
            Asana::new(11, "Hastauttanasana", "Raised Arms Pose", "/images/hastauttanasana.jpg"),
            Asana::new(12, "Tadasana", "Mountain Pose", "/images/tadasana.jpg"),
        ],
    }
}

/// Collection of routines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    routines: Vec<Routine>,
}

impl Catalog {
    pub fn builtin() -> Self {
        Self {
            routines: vec![surya_namaskar()],
        }
    }

    /// Load a JSON array of routines
    pub fn from_json(json: &str) -> SessionResult<Self> {
        let routines: Vec<Routine> = serde_json::from_str(json)?;
        if let Some(empty) = routines.iter().find(|r| r.asanas.is_empty()) {
            return Err(SessionError::Catalog(format!(
                "routine '{}' has no asanas",
                empty.id
            )));
        }
        Ok(Self { routines })
    }

    pub fn routines(&self) -> &[Routine] {
        &self.routines
    }

    pub fn routine(&self, id: &str) -> Option<&Routine> {
        self.routines.iter().find(|r| r.id == id)
    }
}
