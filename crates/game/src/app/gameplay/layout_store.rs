#[derive(Debug, Error)]
pub(crate) enum LayoutStoreError {
    #[error("read layout '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse layout '{path}' at {field}: {message}")]
    Parse {
        path: PathBuf,
        field: String,
        message: String,
    },
    #[error("invalid layout at {field}: {message}")]
    Invalid { field: String, message: String },
    #[error("encode layout: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("write layout '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Per-house interior layouts, keyed by [`HouseKey`].
pub(crate) trait LayoutStore {
    fn load(&self, house: &HouseKey) -> Result<Option<HouseLayout>, LayoutStoreError>;
    fn save(&mut self, house: &HouseKey, layout: &HouseLayout) -> Result<(), LayoutStoreError>;
    /// Drops the saved layout of a removed house. Missing layouts are not an error.
    fn discard(&mut self, house: &HouseKey) -> Result<(), LayoutStoreError>;
}

impl HouseLayout {
    fn from_container(house: &HouseKey, container: &EntityContainer) -> Self {
        let entries = container
            .entities()
            .iter()
            .filter(|entity| entity.kind != EntityKind::Door)
            .map(|entity| LayoutEntry {
                kind: entity.kind,
                position: [entity.position.x, INTERIOR_FLOOR_Y, entity.position.z],
                yaw: entity.orientation.yaw,
            })
            .collect();
        Self {
            version: LAYOUT_VERSION,
            house: house.as_str().to_string(),
            entries,
        }
    }

    fn validate(&self, house: &HouseKey) -> Result<(), LayoutStoreError> {
        if self.version != LAYOUT_VERSION {
            return Err(layout_invalid("version", LAYOUT_VERSION, self.version));
        }
        if self.house != house.as_str() {
            return Err(layout_invalid("house", house, &self.house));
        }
        for (index, entry) in self.entries.iter().enumerate() {
            for (axis, value) in ["x", "y", "z"].into_iter().zip(entry.position) {
                if !value.is_finite() {
                    return Err(layout_invalid(
                        &format!("entries[{index}].position.{axis}"),
                        "finite number",
                        value,
                    ));
                }
            }
            if !entry.yaw.is_finite() {
                return Err(layout_invalid(
                    &format!("entries[{index}].yaw"),
                    "finite number",
                    entry.yaw,
                ));
            }
        }
        Ok(())
    }
}

fn layout_invalid(field: &str, expected: impl Display, actual: impl Display) -> LayoutStoreError {
    LayoutStoreError::Invalid {
        field: field.to_string(),
        message: format!("expected {expected}, got {actual}"),
    }
}

/// One pretty-printed JSON file per house under the layouts directory.
#[derive(Debug, Clone)]
pub(crate) struct JsonLayoutStore {
    dir: PathBuf,
}

impl JsonLayoutStore {
    pub(crate) fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn layout_path(&self, house: &HouseKey) -> PathBuf {
        self.dir
            .join(format!("{LAYOUT_FILE_PREFIX}{house}{LAYOUT_FILE_SUFFIX}"))
    }

    fn parse_layout_json(raw: &str, path: &Path) -> Result<HouseLayout, LayoutStoreError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize::<_, HouseLayout>(&mut deserializer).map_err(|error| {
            let field = json_field_path(error.path().to_string());
            LayoutStoreError::Parse {
                path: path.to_path_buf(),
                field,
                message: error.into_inner().to_string(),
            }
        })
    }
}

impl LayoutStore for JsonLayoutStore {
    fn load(&self, house: &HouseKey) -> Result<Option<HouseLayout>, LayoutStoreError> {
        let path = self.layout_path(house);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).map_err(|source| LayoutStoreError::Read {
            path: path.clone(),
            source,
        })?;
        let layout = Self::parse_layout_json(&raw, &path)?;
        layout.validate(house)?;
        Ok(Some(layout))
    }

    fn save(&mut self, house: &HouseKey, layout: &HouseLayout) -> Result<(), LayoutStoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| LayoutStoreError::Write {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.layout_path(house);
        let json = serde_json::to_string_pretty(layout)?;
        // Sibling temp file, then rename over the target.
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json).map_err(|source| LayoutStoreError::Write {
            path: temp_path.clone(),
            source,
        })?;
        fs::rename(&temp_path, &path).map_err(|source| LayoutStoreError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(())
    }

    fn discard(&mut self, house: &HouseKey) -> Result<(), LayoutStoreError> {
        let path = self.layout_path(house);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LayoutStoreError::Write { path, source }),
        }
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
struct MemoryLayoutStore {
    layouts: HashMap<HouseKey, HouseLayout>,
    fail_saves: bool,
}

#[cfg(test)]
impl MemoryLayoutStore {
    fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
impl LayoutStore for MemoryLayoutStore {
    fn load(&self, house: &HouseKey) -> Result<Option<HouseLayout>, LayoutStoreError> {
        let Some(layout) = self.layouts.get(house) else {
            return Ok(None);
        };
        layout.validate(house)?;
        Ok(Some(layout.clone()))
    }

    fn save(&mut self, house: &HouseKey, layout: &HouseLayout) -> Result<(), LayoutStoreError> {
        if self.fail_saves {
            return Err(LayoutStoreError::Write {
                path: PathBuf::from("memory"),
                source: io::Error::other("store is read-only"),
            });
        }
        self.layouts.insert(house.clone(), layout.clone());
        Ok(())
    }

    fn discard(&mut self, house: &HouseKey) -> Result<(), LayoutStoreError> {
        self.layouts.remove(house);
        Ok(())
    }
}
