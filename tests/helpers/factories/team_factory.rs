use crate::command::types::{TableVersion, Team};

pub struct TeamFactory {
    inner: Team,
}

impl TeamFactory {
    pub fn new() -> Self {
        Self {
            inner: Team {
                id: 1,
                timezone: "UTC".into(),
                table_version: None,
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.inner.id = id;
        self
    }

    pub fn with_timezone(mut self, tz: &str) -> Self {
        self.inner.timezone = tz.to_string();
        self
    }

    pub fn with_table_version(mut self, version: TableVersion) -> Self {
        self.inner.table_version = Some(version);
        self
    }

    pub fn create(self) -> Team {
        self.inner
    }
}
