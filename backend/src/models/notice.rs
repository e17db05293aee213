use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Destructive,
}

/// Transient notification shown after an action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Form field a validation failure refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl Notice {
    pub fn success(title: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, title: title.into(), description: None, field: None }
    }

    pub fn failure(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Destructive,
            title: title.into(),
            description: Some(description.into()),
            field: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_field(mut self, field: Option<&'static str>) -> Self {
        self.field = field;
        self
    }
}

/// Body returned by form submissions.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse<T: Serialize = ()> {
    pub notice: Notice,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl ActionResponse<()> {
    pub fn notice(notice: Notice) -> Self {
        Self { notice, redirect: None, data: None }
    }
}

impl<T: Serialize> ActionResponse<T> {
    pub fn with_data(notice: Notice, data: T) -> Self {
        Self { notice, redirect: None, data: Some(data) }
    }

    pub fn redirect_to(mut self, path: impl Into<String>) -> Self {
        self.redirect = Some(path.into());
        self
    }
}
