/// Tunables for the gameplay core. Every field may be overridden from
/// `assets/base/gameplay.json`; missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameplayConfig {
    pub(crate) world_half_size: f32,
    pub(crate) hard_margin: f32,
    pub(crate) soft_margin: f32,
    pub(crate) spawn_clear_radius: f32,
    pub(crate) interaction_distance: f32,
    pub(crate) placement_distance: f32,
    pub(crate) placement_min_distance: f32,
    pub(crate) placement_max_distance: f32,
    pub(crate) eye_height: f32,
    pub(crate) walk_speed: f32,
    pub(crate) look_sensitivity: f32,
    pub(crate) day_duration_seconds: f32,
    pub(crate) night_duration_seconds: f32,
    pub(crate) room_half_size: f32,
    pub(crate) indoor_wander_radius: f32,
    pub(crate) outdoor_wait_min_seconds: f32,
    pub(crate) outdoor_wait_max_seconds: f32,
    pub(crate) indoor_wait_min_seconds: f32,
    pub(crate) indoor_wait_max_seconds: f32,
    pub(crate) outdoor_arrive_threshold: f32,
    pub(crate) indoor_arrive_threshold: f32,
    pub(crate) tree_count: u32,
    pub(crate) rock_count: u32,
    pub(crate) house_count: u32,
    pub(crate) animal_count: u32,
    pub(crate) seed: u64,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            world_half_size: 40.0,
            hard_margin: 1.0,
            soft_margin: 3.0,
            spawn_clear_radius: 6.0,
            interaction_distance: 8.0,
            placement_distance: 5.0,
            placement_min_distance: 1.5,
            placement_max_distance: 8.0,
            eye_height: 1.7,
            walk_speed: 5.0,
            look_sensitivity: 0.0025,
            day_duration_seconds: 120.0,
            night_duration_seconds: 60.0,
            room_half_size: 5.0,
            indoor_wander_radius: 2.5,
            outdoor_wait_min_seconds: 2.0,
            outdoor_wait_max_seconds: 6.0,
            indoor_wait_min_seconds: 1.0,
            indoor_wait_max_seconds: 4.0,
            outdoor_arrive_threshold: 1.0,
            indoor_arrive_threshold: 0.3,
            tree_count: 40,
            rock_count: 25,
            house_count: 3,
            animal_count: 12,
            seed: 7,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum GameplayConfigError {
    #[error("read gameplay config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse gameplay config '{path}' at {field}: {message}")]
    Parse {
        path: PathBuf,
        field: String,
        message: String,
    },
    #[error("invalid gameplay config at {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl GameplayConfig {
    /// Reads the override file if present; a missing file means defaults.
    pub(crate) fn load_or_default(path: &Path) -> Result<Self, GameplayConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "gameplay_config_defaults");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|source| GameplayConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse_json(&raw, path)?;
        config.validate()?;
        info!(path = %path.display(), "gameplay_config_loaded");
        Ok(config)
    }

    fn parse_json(raw: &str, path: &Path) -> Result<Self, GameplayConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize::<_, Self>(&mut deserializer).map_err(|error| {
            let field = json_field_path(error.path().to_string());
            GameplayConfigError::Parse {
                path: path.to_path_buf(),
                field,
                message: error.into_inner().to_string(),
            }
        })
    }

    fn validate(&self) -> Result<(), GameplayConfigError> {
        let positive = [
            ("world_half_size", self.world_half_size),
            ("interaction_distance", self.interaction_distance),
            ("placement_distance", self.placement_distance),
            ("placement_max_distance", self.placement_max_distance),
            ("eye_height", self.eye_height),
            ("walk_speed", self.walk_speed),
            ("look_sensitivity", self.look_sensitivity),
            ("day_duration_seconds", self.day_duration_seconds),
            ("night_duration_seconds", self.night_duration_seconds),
            ("room_half_size", self.room_half_size),
            ("indoor_wander_radius", self.indoor_wander_radius),
            ("outdoor_arrive_threshold", self.outdoor_arrive_threshold),
            ("indoor_arrive_threshold", self.indoor_arrive_threshold),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(field, "> 0", value));
            }
        }
        let non_negative = [
            ("hard_margin", self.hard_margin),
            ("soft_margin", self.soft_margin),
            ("spawn_clear_radius", self.spawn_clear_radius),
            ("placement_min_distance", self.placement_min_distance),
            ("outdoor_wait_min_seconds", self.outdoor_wait_min_seconds),
            ("indoor_wait_min_seconds", self.indoor_wait_min_seconds),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(field, ">= 0", value));
            }
        }
        if self.hard_margin + self.soft_margin >= self.world_half_size {
            return Err(invalid(
                "soft_margin",
                "hard_margin + soft_margin < world_half_size",
                self.hard_margin + self.soft_margin,
            ));
        }
        if self.spawn_clear_radius >= self.world_half_size - self.hard_margin {
            return Err(invalid(
                "spawn_clear_radius",
                "< world_half_size - hard_margin",
                self.spawn_clear_radius,
            ));
        }
        if self.placement_min_distance > self.placement_max_distance {
            return Err(invalid(
                "placement_min_distance",
                "<= placement_max_distance",
                self.placement_min_distance,
            ));
        }
        if self.room_half_size <= ROOM_ENTRY_INSET + ROOM_WALL_MARGIN {
            return Err(invalid(
                "room_half_size",
                format!("> {}", ROOM_ENTRY_INSET + ROOM_WALL_MARGIN),
                self.room_half_size,
            ));
        }
        if !wait_range_is_ordered(self.outdoor_wait_min_seconds, self.outdoor_wait_max_seconds) {
            return Err(invalid(
                "outdoor_wait_max_seconds",
                "> outdoor_wait_min_seconds",
                self.outdoor_wait_max_seconds,
            ));
        }
        if !wait_range_is_ordered(self.indoor_wait_min_seconds, self.indoor_wait_max_seconds) {
            return Err(invalid(
                "indoor_wait_max_seconds",
                "> indoor_wait_min_seconds",
                self.indoor_wait_max_seconds,
            ));
        }
        Ok(())
    }

    /// Largest coordinate the player and animals may reach outdoors.
    fn outdoor_limit(&self) -> f32 {
        self.world_half_size - self.hard_margin
    }

    fn room_limit(&self) -> f32 {
        self.room_half_size - ROOM_WALL_MARGIN
    }

    fn outdoor_wander_mode(&self) -> WanderMode {
        WanderMode {
            floor_y: OUTDOOR_FLOOR_Y,
            limit: self.outdoor_limit(),
            soft_limit: Some(self.world_half_size - self.hard_margin - self.soft_margin),
            center: None,
            radius_cap: None,
            wait_min: self.outdoor_wait_min_seconds,
            wait_max: self.outdoor_wait_max_seconds,
            arrive_threshold: self.outdoor_arrive_threshold,
        }
    }

    fn indoor_wander_mode(&self) -> WanderMode {
        WanderMode {
            floor_y: INTERIOR_FLOOR_Y,
            limit: self.room_limit(),
            soft_limit: None,
            center: Some(Vec3::new(0.0, INTERIOR_FLOOR_Y, 0.0)),
            radius_cap: Some(self.indoor_wander_radius),
            wait_min: self.indoor_wait_min_seconds,
            wait_max: self.indoor_wait_max_seconds,
            arrive_threshold: self.indoor_arrive_threshold,
        }
    }
}

fn invalid(field: &'static str, expected: impl Display, actual: impl Display) -> GameplayConfigError {
    GameplayConfigError::Invalid {
        field,
        message: format!("expected {expected}, got {actual}"),
    }
}

fn wait_range_is_ordered(min: f32, max: f32) -> bool {
    max.is_finite() && max > min
}

fn json_field_path(path: String) -> String {
    if path.is_empty() || path == "." {
        "<root>".to_string()
    } else {
        path
    }
}
