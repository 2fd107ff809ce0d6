use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use mosaic_config::WidgetInstance;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::MigrationError;
use crate::merge::merge_config;

/// One step of a migration chain: takes the config stored at version `n` and
/// returns the config for version `n + 1`.
pub type MigrationFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// A registered widget type: its current version, its default config and its
/// migration chain.
#[derive(Clone)]
pub struct WidgetType {
  name: String,
  current_version: u32,
  defaults: Value,
  migrations: BTreeMap<u32, MigrationFn>,
}

impl WidgetType {
  pub fn new(name: impl Into<String>, current_version: u32) -> Self {
    Self {
      name: name.into(),
      current_version,
      defaults: Value::Object(Default::default()),
      migrations: BTreeMap::new(),
    }
  }

  pub fn with_defaults(mut self, defaults: Value) -> Self {
    self.defaults = defaults;
    self
  }

  /// Register the step that upgrades a config from `from` to `from + 1`.
  pub fn with_migration<F>(mut self, from: u32, migration: F) -> Self
  where
    F: Fn(Value) -> Value + Send + Sync + 'static,
  {
    self.migrations.insert(from, Arc::new(migration));
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn current_version(&self) -> u32 {
    self.current_version
  }

  pub fn defaults(&self) -> &Value {
    &self.defaults
  }

  /// Versions below the current one that have no outgoing step.
  pub fn missing_steps(&self) -> Vec<u32> {
    (1..self.current_version)
      .filter(|version| !self.migrations.contains_key(version))
      .collect()
  }

  /// Walk the chain from `from` towards `to`.
  ///
  /// Returns the config and the version reached. Stops early at the first
  /// gap, keeping the steps already applied.
  fn walk(&self, mut config: Value, from: u32, to: u32) -> (Value, u32) {
    let mut version = from;
    while version < to {
      let Some(step) = self.migrations.get(&version) else {
        break;
      };
      config = step(config);
      debug!(widget_type = %self.name, from = version, to = version + 1, "applied migration step");
      version += 1;
    }
    (config, version)
  }
}

impl fmt::Debug for WidgetType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WidgetType")
      .field("name", &self.name)
      .field("current_version", &self.current_version)
      .field("defaults", &self.defaults)
      .field("migrations", &self.migrations.keys().collect::<Vec<_>>())
      .finish()
  }
}

/// The outcome of loading a stored instance through the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
  /// Already at the current version.
  Current(WidgetInstance),
  /// Upgraded from `from` to the current version.
  Upgraded { instance: WidgetInstance, from: u32 },
  /// The chain had a gap at `missing_step`. The instance carries the steps
  /// applied so far and `version == reached`.
  Partial {
    instance: WidgetInstance,
    reached: u32,
    target: u32,
    missing_step: u32,
  },
  /// Stored by a newer build. Left unchanged.
  Ahead { instance: WidgetInstance, current: u32 },
  /// No widget type registered under this name. Left unchanged; the host
  /// renders a fallback.
  UnknownType(WidgetInstance),
}

impl Normalized {
  pub fn instance(&self) -> &WidgetInstance {
    match self {
      Normalized::Current(instance)
      | Normalized::Upgraded { instance, .. }
      | Normalized::Partial { instance, .. }
      | Normalized::Ahead { instance, .. }
      | Normalized::UnknownType(instance) => instance,
    }
  }

  pub fn into_instance(self) -> WidgetInstance {
    match self {
      Normalized::Current(instance)
      | Normalized::Upgraded { instance, .. }
      | Normalized::Partial { instance, .. }
      | Normalized::Ahead { instance, .. }
      | Normalized::UnknownType(instance) => instance,
    }
  }

  pub fn is_unknown_type(&self) -> bool {
    matches!(self, Normalized::UnknownType(_))
  }
}

/// Registry of widget types keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct WidgetRegistry {
  types: HashMap<String, Arc<WidgetType>>,
}

impl WidgetRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a widget type, returning the registration it replaced.
  pub fn register(&mut self, widget_type: WidgetType) -> Option<Arc<WidgetType>> {
    let gaps = widget_type.missing_steps();
    if !gaps.is_empty() {
      warn!(
        widget_type = %widget_type.name,
        missing = ?gaps,
        "migration chain has gaps; older instances will only partially upgrade"
      );
    }
    self
      .types
      .insert(widget_type.name.clone(), Arc::new(widget_type))
  }

  pub fn get(&self, widget_type: &str) -> Option<&WidgetType> {
    self.types.get(widget_type).map(Arc::as_ref)
  }

  pub fn contains(&self, widget_type: &str) -> bool {
    self.types.contains_key(widget_type)
  }

  pub fn current_version(&self, widget_type: &str) -> Option<u32> {
    self.get(widget_type).map(WidgetType::current_version)
  }

  pub fn defaults(&self, widget_type: &str) -> Option<&Value> {
    self.get(widget_type).map(WidgetType::defaults)
  }

  /// Create a fresh instance of a registered type at its current version.
  ///
  /// The config is the type's defaults overlaid with `user_config`.
  pub fn create_instance(
    &self,
    widget_type: &str,
    user_config: Value,
  ) -> Result<WidgetInstance, MigrationError> {
    let registered = self.lookup(widget_type)?;
    Ok(WidgetInstance {
      id: uuid::Uuid::new_v4().to_string(),
      widget_type: widget_type.to_string(),
      version: registered.current_version,
      config: merge_config(&registered.defaults, user_config),
      layout_position: None,
    })
  }

  /// Migrate `config` from version `from` to version `to`.
  pub fn migrate(
    &self,
    widget_type: &str,
    config: Value,
    from: u32,
    to: u32,
  ) -> Result<Value, MigrationError> {
    let registered = self.lookup(widget_type)?;
    if from > to {
      return Err(MigrationError::Downgrade {
        widget_type: widget_type.to_string(),
        from,
        to,
      });
    }

    let (config, reached) = registered.walk(config, from, to);
    if reached < to {
      return Err(MigrationError::MissingStep {
        widget_type: widget_type.to_string(),
        reached,
        target: to,
        config,
      });
    }
    Ok(config)
  }

  /// Bring a stored instance up to its type's current version.
  pub fn normalize(&self, mut instance: WidgetInstance) -> Normalized {
    let Some(registered) = self.get(&instance.widget_type) else {
      warn!(
        widget_id = %instance.id,
        widget_type = %instance.widget_type,
        "unknown widget type"
      );
      return Normalized::UnknownType(instance);
    };

    let stored = instance.version;
    let current = registered.current_version;

    if stored == current {
      return Normalized::Current(instance);
    }

    if stored > current {
      warn!(
        widget_id = %instance.id,
        widget_type = %instance.widget_type,
        stored,
        current,
        "instance is newer than the registered widget type; leaving unchanged"
      );
      return Normalized::Ahead { instance, current };
    }

    let config = std::mem::take(&mut instance.config);
    let (config, reached) = registered.walk(config, stored, current);
    instance.config = config;
    instance.version = reached;

    if reached < current {
      warn!(
        widget_id = %instance.id,
        widget_type = %instance.widget_type,
        stored,
        reached,
        target = current,
        "migration chain incomplete; instance partially upgraded"
      );
      return Normalized::Partial {
        instance,
        reached,
        target: current,
        missing_step: reached,
      };
    }

    info!(
      widget_id = %instance.id,
      widget_type = %instance.widget_type,
      from = stored,
      to = current,
      "upgraded widget instance"
    );
    Normalized::Upgraded {
      instance,
      from: stored,
    }
  }

  fn lookup(&self, widget_type: &str) -> Result<&WidgetType, MigrationError> {
    self
      .get(widget_type)
      .ok_or_else(|| MigrationError::UnknownWidgetType {
        widget_type: widget_type.to_string(),
      })
  }
}
