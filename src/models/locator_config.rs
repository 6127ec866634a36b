//! 定位器配置：工作流步骤 → 定位角色 → 定位表达式

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::LocatorError;
use crate::models::locator::Locator;

/// 定位角色（步骤名 + 角色名）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Role {
    pub step: &'static str,
    pub name: &'static str,
}

impl Role {
    pub const fn new(step: &'static str, name: &'static str) -> Self {
        Self { step, name }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.step, self.name)
    }
}

/// 内置的所有定位角色
pub mod roles {
    use super::Role;

    pub const LOGIN: &str = "login";
    pub const NAVIGATION: &str = "navigation";
    pub const QUERY: &str = "query";
    pub const RESULTS: &str = "results";

    // 登录
    pub const CPF_FIELD: Role = Role::new(LOGIN, "cpf_field");
    pub const PASSWORD_FIELD: Role = Role::new(LOGIN, "password_field");
    pub const LOGIN_SUBMIT: Role = Role::new(LOGIN, "submit");

    // 导航
    pub const RESTRICTED_AREA: Role = Role::new(NAVIGATION, "restricted_area");
    pub const DOWNLOAD_SERVICE: Role = Role::new(NAVIGATION, "download_service");
    pub const CERTIFICATE_CONFIRM: Role = Role::new(NAVIGATION, "certificate_confirm");

    // 查询表单
    pub const START_DATE: Role = Role::new(QUERY, "start_date");
    pub const END_DATE: Role = Role::new(QUERY, "end_date");
    pub const ENTITY_ID: Role = Role::new(QUERY, "entity_id");
    pub const INCOMING_OPTION: Role = Role::new(QUERY, "incoming_option");
    pub const OUTGOING_OPTION: Role = Role::new(QUERY, "outgoing_option");
    pub const SEARCH_BUTTON: Role = Role::new(QUERY, "search_button");

    // 结果页
    pub const RESULTS_TABLE: Role = Role::new(RESULTS, "results_table");
    pub const NO_RESULTS: Role = Role::new(RESULTS, "no_results");
    pub const TOTAL_COUNT: Role = Role::new(RESULTS, "total_count");
    pub const DOWNLOAD_LINK: Role = Role::new(RESULTS, "download_link");
    pub const NEW_QUERY: Role = Role::new(RESULTS, "new_query");
}

/// 内置默认表
const DEFAULTS: &[(Role, &str)] = &[
    (roles::CPF_FIELD, "name:cpf"),
    (roles::PASSWORD_FIELD, "name:senha"),
    (roles::LOGIN_SUBMIT, "xpath://button[contains(., 'Autenticar')]"),
    (roles::RESTRICTED_AREA, "link:Acesso Restrito"),
    (roles::DOWNLOAD_SERVICE, "link:Baixar XML NFE"),
    (
        roles::CERTIFICATE_CONFIRM,
        "xpath://button[contains(., 'Certificado') or contains(., 'Continuar')]",
    ),
    (roles::START_DATE, "id:dataInicio"),
    (roles::END_DATE, "id:dataFim"),
    (roles::ENTITY_ID, "id:inscricaoEstadual"),
    (roles::INCOMING_OPTION, "xpath://label[contains(., 'Entradas')]"),
    (roles::OUTGOING_OPTION, "xpath://label[contains(., 'Saidas') or contains(., 'Saídas')]"),
    (roles::SEARCH_BUTTON, "id:btnPesquisar"),
    (roles::RESULTS_TABLE, "css:table"),
    (roles::NO_RESULTS, "xpath://*[contains(text(), 'Sem Resultados')]"),
    (roles::TOTAL_COUNT, "xpath://div[contains(text(), 'Total de notas:')]"),
    (roles::DOWNLOAD_LINK, "link:Baixar XML"),
    (roles::NEW_QUERY, "link:Nova Consulta"),
];

/// 定位器配置
///
/// 不变量：每个内置角色都有值（默认或覆盖），不会缺失。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorConfig {
    steps: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl LocatorConfig {
    /// 内置默认定位器
    pub fn defaults() -> Self {
        let mut steps: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for (role, expr) in DEFAULTS {
            steps
                .entry(role.step.to_string())
                .or_default()
                .insert(role.name.to_string(), expr.to_string());
        }
        Self { steps }
    }

    /// 获取原始表达式
    pub fn expression(&self, step: &str, role: &str) -> Option<&str> {
        self.steps
            .get(step)
            .and_then(|roles| roles.get(role))
            .map(String::as_str)
    }

    /// 获取解析后的定位器
    pub fn locator(&self, role: Role) -> Result<Locator, LocatorError> {
        self.expression(role.step, role.name)
            .map(Locator::parse)
            .ok_or_else(|| LocatorError::UnknownRole {
                step: role.step.to_string(),
                role: role.name.to_string(),
            })
    }

    /// 步骤名列表
    pub fn steps(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    /// 按键合并覆盖表
    ///
    /// 只接受已知步骤下的已知角色，且值必须是字符串；其余键忽略。
    /// 返回实际生效的覆盖数量。
    pub fn merge(&mut self, overrides: &toml::Table) -> usize {
        let mut applied = 0;
        for (step, section) in overrides {
            let Some(known) = self.steps.get_mut(step) else {
                debug!("忽略未知的定位步骤: {}", step);
                continue;
            };
            let Some(section) = section.as_table() else {
                debug!("定位步骤 {} 不是表，忽略", step);
                continue;
            };
            for (role, value) in section {
                match (known.get_mut(role), value.as_str()) {
                    (Some(slot), Some(expr)) => {
                        *slot = expr.to_string();
                        applied += 1;
                    }
                    (None, _) => debug!("忽略未知的定位角色: {}.{}", step, role),
                    (Some(_), None) => debug!("定位角色 {}.{} 的值不是字符串，忽略", step, role),
                }
            }
        }
        applied
    }
}
