#![allow(dead_code)]

use chrono::NaiveDateTime;
use rust_sqlite_orm::{
    FieldDescriptor, OrmConfig, Record, Registry, Result, SqliteConnectionProvider, Value, Values,
};
use std::sync::Arc;
use tempfile::NamedTempFile;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Member {
    pub member_id: i64,
    pub xp: i64,
    pub level: i32,
    pub messages: i64,
    pub counted_messages: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Member {
    pub fn new(member_id: i64, xp: i64, level: i32) -> Self {
        Self {
            member_id,
            xp,
            level,
            ..Self::default()
        }
    }
}

impl Record for Member {
    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::of::<i64>("member_id").primary_key(),
            FieldDescriptor::of::<i64>("xp"),
            FieldDescriptor::of::<i32>("level"),
            FieldDescriptor::of::<i64>("messages"),
            FieldDescriptor::of::<i64>("counted_messages"),
            FieldDescriptor::of::<NaiveDateTime>("created_at").created_at(),
            FieldDescriptor::of::<NaiveDateTime>("updated_at").updated_at(),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.member_id.into(),
            self.xp.into(),
            self.level.into(),
            self.messages.into(),
            self.counted_messages.into(),
            self.created_at.into(),
            self.updated_at.into(),
        ]
    }

    fn from_values(mut values: Values) -> Result<Self> {
        Ok(Self {
            member_id: values.take()?,
            xp: values.take()?,
            level: values.take()?,
            messages: values.take()?,
            counted_messages: values.take()?,
            created_at: values.take()?,
            updated_at: values.take()?,
        })
    }
}

/// Text key, floats, a small int and an explicit table name.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GuildRecord {
    pub tag: String,
    pub name: String,
    pub rank: i16,
    pub ratio: f32,
    pub score: f64,
}

impl Record for GuildRecord {
    const TABLE_NAME: Option<&'static str> = Some("guild_registry");

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::of::<String>("tag").primary_key(),
            FieldDescriptor::of::<String>("name"),
            FieldDescriptor::of::<i16>("rank"),
            FieldDescriptor::of::<f32>("ratio"),
            FieldDescriptor::of::<f64>("score"),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.tag.clone().into(),
            self.name.clone().into(),
            self.rank.into(),
            self.ratio.into(),
            self.score.into(),
        ]
    }

    fn from_values(mut values: Values) -> Result<Self> {
        Ok(Self {
            tag: values.take()?,
            name: values.take()?,
            rank: values.take()?,
            ratio: values.take()?,
            score: values.take()?,
        })
    }
}

/// Declares a field type with no column mapping.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Flag {
    pub id: i64,
    pub active: bool,
}

impl Record for Flag {
    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::of::<i64>("id").primary_key(),
            FieldDescriptor::of::<bool>("active"),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![self.id.into(), self.active.into()]
    }

    fn from_values(mut values: Values) -> Result<Self> {
        Ok(Self {
            id: values.take()?,
            active: values.take()?,
        })
    }
}

/// Claims two primary keys.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Ledger {
    pub id: i64,
    pub other_id: i64,
}

impl Record for Ledger {
    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::of::<i64>("id").primary_key(),
            FieldDescriptor::of::<i64>("other_id").primary_key(),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![self.id.into(), self.other_id.into()]
    }

    fn from_values(mut values: Values) -> Result<Self> {
        Ok(Self {
            id: values.take()?,
            other_id: values.take()?,
        })
    }
}

/// Routes statement traces to the test output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Registry over a fresh temporary database file. Keep the file alive for
/// as long as the registry is used.
pub fn create_temp_registry() -> (Registry, NamedTempFile) {
    init_tracing();
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap().to_string();
    (registry_at(&path), temp_file)
}

pub fn registry_at(path: &str) -> Registry {
    let config = OrmConfig::new(path);
    Registry::new(Arc::new(SqliteConnectionProvider::from_config(&config)), config)
}
