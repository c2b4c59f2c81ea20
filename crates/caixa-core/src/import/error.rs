//! Import pipeline errors and their user-facing messages

use serde::Serialize;
use thiserror::Error;

use crate::error::Error;

/// Why an import run stopped
///
/// Categorization problems never show up here: a failed batch falls back to
/// default categories and the run continues.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Bank account name is required")]
    MissingBankAccount,

    #[error("An import is already running")]
    AlreadyRunning,

    #[error("No failed import to retry")]
    NothingToRetry,

    #[error("Failed to read statement: {0}")]
    Read(#[source] Error),

    #[error("Transaction extraction failed: {0}")]
    Llm(#[source] Error),

    #[error("No transactions found in the statement")]
    NoTransactionsFound,

    #[error("No valid transactions after validation")]
    NoValidTransactions,

    #[error("Failed to save transactions: {0}")]
    Persistence(#[source] Error),
}

/// Title and detail shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorMessage {
    pub title: String,
    pub detail: String,
}

impl ErrorMessage {
    fn new(title: &str, detail: &str) -> Self {
        Self {
            title: title.to_string(),
            detail: detail.to_string(),
        }
    }
}

impl ImportError {
    /// The wrapped library error, if any
    pub fn cause(&self) -> Option<&Error> {
        match self {
            Self::Read(e) | Self::Llm(e) | Self::Persistence(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.cause().is_some_and(Error::is_timeout)
    }

    /// Map the failure to a message the user can act on
    pub fn user_message(&self) -> ErrorMessage {
        if self.is_timeout() {
            return ErrorMessage::new(
                "Tempo limite excedido",
                "O arquivo é muito grande para ser processado de uma vez. \
                 Divida o extrato em um período menor e tente novamente.",
            );
        }

        match self {
            Self::MissingBankAccount => ErrorMessage::new(
                "Conta bancária obrigatória",
                "Informe o nome da conta bancária antes de importar o extrato.",
            ),
            Self::AlreadyRunning => ErrorMessage::new(
                "Importação em andamento",
                "Aguarde a importação atual terminar antes de enviar outro arquivo.",
            ),
            Self::NothingToRetry => ErrorMessage::new(
                "Nada para tentar novamente",
                "Nenhuma importação com erro foi encontrada. Envie o arquivo novamente.",
            ),
            Self::NoTransactionsFound => ErrorMessage::new(
                "Nenhuma transação encontrada",
                "Não encontramos transações no arquivo. Verifique se ele contém um \
                 extrato bancário válido.",
            ),
            Self::NoValidTransactions => ErrorMessage::new(
                "Nenhuma transação válida",
                "As transações encontradas não tinham data, descrição, valor ou tipo \
                 válidos.",
            ),
            Self::Read(_) | Self::Llm(_) | Self::Persistence(_) => ErrorMessage::new(
                "Erro ao processar extrato",
                "Ocorreu um erro ao processar o arquivo. Tente novamente em alguns \
                 instantes.",
            ),
        }
    }
}
