//! Domain models for Caixa

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Direction of a money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Apply the storage sign convention: expenses negative, income positive
    pub fn signed(&self, amount: f64) -> f64 {
        match self {
            Self::Income => amount.abs(),
            Self::Expense => -amount.abs(),
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" | "receita" | "entrada" | "credit" => Ok(Self::Income),
            "expense" | "despesa" | "saida" | "saída" | "debit" => Ok(Self::Expense),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fixed category taxonomy shared by the ledger, importer and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    // Income
    Vendas,
    Servicos,
    Investimentos,
    Emprestimos,
    OutrasReceitas,
    // Expense
    Fornecedores,
    Salarios,
    Aluguel,
    Impostos,
    Marketing,
    Transporte,
    Alimentacao,
    ServicosPublicos,
    Equipamentos,
    Manutencao,
    OutrasDespesas,
}

impl Category {
    pub const INCOME: [Category; 5] = [
        Self::Vendas,
        Self::Servicos,
        Self::Investimentos,
        Self::Emprestimos,
        Self::OutrasReceitas,
    ];

    pub const EXPENSE: [Category; 11] = [
        Self::Fornecedores,
        Self::Salarios,
        Self::Aluguel,
        Self::Impostos,
        Self::Marketing,
        Self::Transporte,
        Self::Alimentacao,
        Self::ServicosPublicos,
        Self::Equipamentos,
        Self::Manutencao,
        Self::OutrasDespesas,
    ];

    /// All categories, income first
    pub fn all() -> impl Iterator<Item = Category> {
        Self::INCOME.into_iter().chain(Self::EXPENSE)
    }

    /// Categories valid for a transaction type
    pub fn for_type(kind: TransactionType) -> &'static [Category] {
        match kind {
            TransactionType::Income => &Self::INCOME,
            TransactionType::Expense => &Self::EXPENSE,
        }
    }

    /// Catch-all category used when nothing better is known
    pub fn default_for(kind: TransactionType) -> Self {
        match kind {
            TransactionType::Income => Self::OutrasReceitas,
            TransactionType::Expense => Self::OutrasDespesas,
        }
    }

    pub fn kind(&self) -> TransactionType {
        if Self::INCOME.contains(self) {
            TransactionType::Income
        } else {
            TransactionType::Expense
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vendas => "vendas",
            Self::Servicos => "servicos",
            Self::Investimentos => "investimentos",
            Self::Emprestimos => "emprestimos",
            Self::OutrasReceitas => "outras_receitas",
            Self::Fornecedores => "fornecedores",
            Self::Salarios => "salarios",
            Self::Aluguel => "aluguel",
            Self::Impostos => "impostos",
            Self::Marketing => "marketing",
            Self::Transporte => "transporte",
            Self::Alimentacao => "alimentacao",
            Self::ServicosPublicos => "servicos_publicos",
            Self::Equipamentos => "equipamentos",
            Self::Manutencao => "manutencao",
            Self::OutrasDespesas => "outras_despesas",
        }
    }

    /// Human-readable (pt-BR) label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Vendas => "Vendas",
            Self::Servicos => "Prestação de Serviços",
            Self::Investimentos => "Rendimentos de Investimentos",
            Self::Emprestimos => "Empréstimos",
            Self::OutrasReceitas => "Outras Receitas",
            Self::Fornecedores => "Fornecedores",
            Self::Salarios => "Salários",
            Self::Aluguel => "Aluguel",
            Self::Impostos => "Impostos e Taxas",
            Self::Marketing => "Marketing",
            Self::Transporte => "Transporte",
            Self::Alimentacao => "Alimentação",
            Self::ServicosPublicos => "Água, Luz e Internet",
            Self::Equipamentos => "Equipamentos",
            Self::Manutencao => "Manutenção",
            Self::OutrasDespesas => "Outras Despesas",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Category::all()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a transaction was paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Dinheiro,
    Pix,
    CartaoCredito,
    CartaoDebito,
    Boleto,
    /// Bank transfer; every imported statement line uses this
    #[default]
    Transferencia,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dinheiro => "dinheiro",
            Self::Pix => "pix",
            Self::CartaoCredito => "cartao_credito",
            Self::CartaoDebito => "cartao_debito",
            Self::Boleto => "boleto",
            Self::Transferencia => "transferencia",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dinheiro" => Ok(Self::Dinheiro),
            "pix" => Ok(Self::Pix),
            "cartao_credito" => Ok(Self::CartaoCredito),
            "cartao_debito" => Ok(Self::CartaoDebito),
            "boleto" => Ok(Self::Boleto),
            "transferencia" => Ok(Self::Transferencia),
            _ => Err(format!("Unknown payment method: {}", s)),
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction source - how it was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionSource {
    /// Extracted from an uploaded bank statement
    #[default]
    Import,
    /// Manually entered
    Manual,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Manual => "manual",
        }
    }
}

impl std::str::FromStr for TransactionSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "import" => Ok(Self::Import),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("Unknown transaction source: {}", s)),
        }
    }
}

/// A transaction ready to be written to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    /// Expected `YYYY-MM-DD`; not re-validated
    pub date: String,
    pub description: String,
    /// Signed: negative for expenses, positive for income
    pub amount: f64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub category: Category,
    pub payment_method: PaymentMethod,
    pub bank_account: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub source: TransactionSource,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// A transaction typed in by hand
///
/// The amount may carry either sign; the stored sign follows the type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualTransaction {
    pub date: String,
    pub description: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Defaults to the catch-all category for the type
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub bank_account: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ManualTransaction {
    /// Validate and normalize into a record for the store
    pub fn into_new(self, created_by: Option<&str>) -> crate::error::Result<NewTransaction> {
        use crate::error::Error;

        let date = self.date.trim();
        if chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
            return Err(Error::InvalidData(format!(
                "Invalid date '{}' (use YYYY-MM-DD)",
                self.date
            )));
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(Error::InvalidData("Description is required".into()));
        }
        if !self.amount.is_finite() || self.amount == 0.0 {
            return Err(Error::InvalidData("Amount must be non-zero".into()));
        }
        let category = match self.category {
            Some(c) if c.kind() != self.transaction_type => {
                return Err(Error::InvalidData(format!(
                    "{} is not a {} category",
                    c, self.transaction_type
                )));
            }
            Some(c) => c,
            None => Category::default_for(self.transaction_type),
        };

        Ok(NewTransaction {
            date: date.to_string(),
            description: description.to_string(),
            amount: self.transaction_type.signed(self.amount),
            transaction_type: self.transaction_type,
            category,
            payment_method: self.payment_method,
            bank_account: self.bank_account.trim().to_string(),
            notes: self.notes.filter(|n| !n.trim().is_empty()),
            source: TransactionSource::Manual,
            created_by: created_by.map(str::to_string),
        })
    }
}

/// A stored transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: String,
    pub description: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub category: Category,
    pub payment_method: PaymentMethod,
    pub bank_account: String,
    pub notes: Option<String>,
    pub source: TransactionSource,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A fixed monthly obligation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringExpense {
    pub id: i64,
    pub description: String,
    /// Positive magnitude
    pub amount: f64,
    pub category: Category,
    /// Day of month the expense is due (1-31, clamped to short months)
    pub due_day: u32,
    pub active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a recurring expense
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecurringExpense {
    pub description: String,
    pub amount: f64,
    #[serde(default = "default_recurring_category")]
    pub category: Category,
    pub due_day: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_recurring_category() -> Category {
    Category::OutrasDespesas
}

impl NewRecurringExpense {
    /// Reject values the store would accept but reminders cannot use
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.description.trim().is_empty() {
            return Err(crate::error::Error::InvalidData(
                "Description is required".into(),
            ));
        }
        validate_recurring_fields(Some(self.amount), Some(self.category), Some(self.due_day))
    }
}

/// Partial update for a recurring expense; `None` leaves the field as is
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecurringExpenseUpdate {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub due_day: Option<u32>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RecurringExpenseUpdate {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self
            .description
            .as_ref()
            .is_some_and(|d| d.trim().is_empty())
        {
            return Err(crate::error::Error::InvalidData(
                "Description cannot be empty".into(),
            ));
        }
        validate_recurring_fields(self.amount, self.category, self.due_day)
    }
}

fn validate_recurring_fields(
    amount: Option<f64>,
    category: Option<Category>,
    due_day: Option<u32>,
) -> crate::error::Result<()> {
    use crate::error::Error;

    if let Some(amount) = amount {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::InvalidData("Amount must be positive".into()));
        }
    }
    if let Some(category) = category {
        if category.kind() != TransactionType::Expense {
            return Err(Error::InvalidData(format!(
                "{} is not an expense category",
                category
            )));
        }
    }
    if let Some(day) = due_day {
        if !(1..=31).contains(&day) {
            return Err(Error::InvalidData("Due day must be between 1 and 31".into()));
        }
    }
    Ok(())
}

fn brl_amount_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^-?\d{1,3}(\.\d{3})*(,\d+)?$|^-?\d+(,\d+)?$").expect("valid amount regex")
    })
}

/// Parse an amount written either as a plain decimal or in Brazilian notation
///
/// Accepts "1.234,56", "1234,56", "1234.56", "R$ 1.234,56" and "-45,90".
/// Returns None when the text is not a number.
pub fn parse_brl_amount(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    let normalized = if brl_amount_pattern().is_match(&cleaned) {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned.replace(',', "")
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}
