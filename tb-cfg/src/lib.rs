//! Configuration settings for `tb`.
//!
//! Every setting is declared once as a `static` [`Config`] with a name, a description, and
//! a default. Binaries register the settings they care about into a [`ConfigSet`], overlay a
//! host config file with [`ConfigSet::apply_toml`], and then apply command line overrides.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{
    Arc, RwLock,
    atomic::{AtomicU64, Ordering},
};

use compact_str::CompactString;
use tb_ore::assert_none;

/// A single configuration setting.
pub struct Config<V: ConfigDefault> {
    name: &'static str,
    desc: &'static str,
    value: V,
}

impl<V: ConfigDefault> Config<V> {
    /// Define a new [`Config`] with a default value.
    pub const fn new(name: &'static str, desc: &'static str, default: V) -> Self {
        Config {
            name,
            desc,
            value: default,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Read the value of this [`Config`] from the provided [`ConfigSet`].
    ///
    /// # Panics
    /// * If this [`Config`] was never registered with the [`ConfigSetBuilder`].
    pub fn read(&self, set: &ConfigSet) -> V::StoredValue {
        let Some(entry) = set.configs.get(self.name) else {
            panic!("tried to read unregistered config {}", self.name);
        };
        V::from_shared(&entry.value)
    }
}

/// A cheaply cloneable set of [`Config`]s.
#[derive(Clone, Debug)]
pub struct ConfigSet {
    configs: Arc<BTreeMap<CompactString, ConfigSetEntry>>,
}

impl ConfigSet {
    /// Returns a new [`ConfigSetBuilder`].
    pub fn builder() -> ConfigSetBuilder {
        ConfigSetBuilder::default()
    }

    /// Update the [`Config`] in this [`ConfigSet`] with `name` to `value`.
    ///
    /// # Errors
    ///
    /// * If no config named `name` exists in this set.
    /// * If the config specified by `name` cannot parse `value`.
    ///
    pub fn try_update(&self, name: &str, value: &str) -> Result<(), anyhow::Error> {
        let entry = self
            .configs
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("no config named '{name}'"))?;
        entry
            .value
            .update_parse(value)
            .map_err(|err| anyhow::anyhow!("invalid value '{value}' for '{name}': {err}"))?;
        Ok(())
    }

    /// Overlay the values of a flat TOML table onto this [`ConfigSet`].
    ///
    /// Keys are config names. Strings and integers are accepted as values, any other kind
    /// of value, or an unknown key, is an error.
    pub fn apply_toml(&self, raw: &str) -> Result<(), anyhow::Error> {
        let table: toml::Table = raw.parse()?;
        for (name, value) in table {
            let value = match value {
                toml::Value::String(val) => val,
                toml::Value::Integer(val) => val.to_string(),
                other => anyhow::bail!(
                    "config '{name}' must be a string or an integer, found {}",
                    other.type_str()
                ),
            };
            self.try_update(&name, &value)?;
        }
        Ok(())
    }
}

impl fmt::Display for ConfigSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, entry) in &*self.configs {
            writeln!(f, "{} => {}\n\t└─ '{}'", name, entry.value, entry.desc)?;
        }
        Ok(())
    }
}

/// Single entry within a [`ConfigSet`].
#[derive(Clone, Debug)]
struct ConfigSetEntry {
    value: SharedConfigValue,
    desc: &'static str,
}

/// A builder for a [`ConfigSet`].
#[derive(Default, Debug)]
pub struct ConfigSetBuilder {
    configs: BTreeMap<CompactString, (DynConfigValue, &'static str)>,
}

impl ConfigSetBuilder {
    /// Register a [`Config`] into this [`ConfigSetBuilder`] with the default value.
    pub fn register<V: ConfigDefault>(&mut self, config: &'static Config<V>) -> &mut Self {
        let value = config.value.into_stored().into_dyn();
        let prev = self
            .configs
            .insert(CompactString::const_new(config.name), (value, config.desc));
        assert_none!(prev, "config '{}' registered more than once", config.name);
        self
    }

    /// Consumes this [`ConfigSetBuilder`] constructing a [`ConfigSet`].
    pub fn build(self) -> ConfigSet {
        let configs = self
            .configs
            .into_iter()
            .map(|(name, (value, desc))| {
                let entry = ConfigSetEntry {
                    value: value.into_shared(),
                    desc,
                };
                (name, entry)
            })
            .collect();
        ConfigSet {
            configs: Arc::new(configs),
        }
    }
}

/// Types that can be provided as a default to a [`Config`].
pub trait ConfigDefault {
    /// The type that actually gets stored in a [`ConfigSet`].
    type StoredValue: ConfigValue;

    fn into_stored(&self) -> Self::StoredValue;
    fn from_shared(val: &SharedConfigValue) -> Self::StoredValue;
}

impl ConfigDefault for u64 {
    type StoredValue = u64;

    fn into_stored(&self) -> Self::StoredValue {
        *self
    }

    fn from_shared(val: &SharedConfigValue) -> Self::StoredValue {
        let SharedConfigValue::U64(val) = val else {
            panic!("programming error, found {val:?} for u64")
        };
        val.load(Ordering::SeqCst)
    }
}

impl ConfigDefault for &str {
    type StoredValue = CompactString;

    fn into_stored(&self) -> Self::StoredValue {
        CompactString::new(self)
    }

    fn from_shared(val: &SharedConfigValue) -> Self::StoredValue {
        let SharedConfigValue::String(val) = val else {
            panic!("programming error, found {val:?} for string")
        };
        val.read()
            .expect("SharedConfigValue::String lock poisoned")
            .clone()
    }
}

pub trait ConfigValue {
    fn into_dyn(self) -> DynConfigValue;
}

impl ConfigValue for u64 {
    fn into_dyn(self) -> DynConfigValue {
        DynConfigValue::U64(self)
    }
}

impl ConfigValue for CompactString {
    fn into_dyn(self) -> DynConfigValue {
        DynConfigValue::String(self)
    }
}

/// "Type erased" configuration values.
#[derive(Debug)]
pub enum DynConfigValue {
    U64(u64),
    String(CompactString),
}

impl DynConfigValue {
    fn into_shared(self) -> SharedConfigValue {
        match self {
            DynConfigValue::U64(val) => SharedConfigValue::U64(Arc::new(AtomicU64::new(val))),
            DynConfigValue::String(val) => SharedConfigValue::String(Arc::new(RwLock::new(val))),
        }
    }
}

/// Shareable instance of [`DynConfigValue`].
#[derive(Clone, Debug)]
pub enum SharedConfigValue {
    U64(Arc<AtomicU64>),
    String(Arc<RwLock<CompactString>>),
}

impl SharedConfigValue {
    fn update_parse(&self, value: &str) -> Result<(), anyhow::Error> {
        match self {
            SharedConfigValue::U64(shared) => {
                let val: u64 = value.trim().parse()?;
                shared.store(val, Ordering::SeqCst);
            }
            SharedConfigValue::String(shared) => {
                *shared
                    .write()
                    .expect("SharedConfigValue::String lock poisoned") = CompactString::new(value);
            }
        }

        Ok(())
    }
}

impl fmt::Display for SharedConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SharedConfigValue::U64(val) => write!(f, "{}", val.load(Ordering::SeqCst)),
            SharedConfigValue::String(val) => {
                let read_lock = val
                    .read()
                    .expect("SharedConfigValue::String lock poisoned");
                write!(f, "{}", *read_lock)
            }
        }
    }
}
