use chrono::NaiveDate;

use crate::error::ConfigError;
use crate::models::locator_config::{roles, Role};

/// 门户日期格式
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// 票据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// 进项（Entradas）
    Incoming,
    /// 销项（Saídas）
    Outgoing,
}

impl Category {
    /// 固定的处理顺序
    pub const ALL: [Category; 2] = [Category::Incoming, Category::Outgoing];

    /// 目录名
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Incoming => "incoming",
            Category::Outgoing => "outgoing",
        }
    }

    /// 查询表单上对应的选项
    pub fn option_role(self) -> Role {
        match self {
            Category::Incoming => roles::INCOMING_OPTION,
            Category::Outgoing => roles::OUTGOING_OPTION,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// 查询日期区间（闭区间）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::InvalidRange {
                start: start.format(DATE_FORMAT).to_string(),
                end: end.format(DATE_FORMAT).to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// 解析 DD/MM/AAAA 格式的日期区间
    pub fn parse(start: &str, end: &str) -> Result<Self, ConfigError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// 表单中填写的开始日期
    pub fn start_text(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    /// 表单中填写的结束日期
    pub fn end_text(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

fn parse_date(text: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|_| ConfigError::InvalidDate(text.to_string()))
}

/// 单次查询：一个 IE 的一个票据类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityQuery {
    entity_id: String,
    range: DateRange,
    category: Category,
}

impl EntityQuery {
    pub fn new(entity_id: impl Into<String>, range: DateRange, category: Category) -> Self {
        Self {
            entity_id: entity_id.into(),
            range,
            category,
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn range(&self) -> &DateRange {
        &self.range
    }

    pub fn category(&self) -> Category {
        self.category
    }
}

impl std::fmt::Display for EntityQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[IE {}/{}]", self.entity_id, self.category)
    }
}
