//! Notification kinds and the text each one renders.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Display name used when the sender's profile is missing or unnamed
pub const DEFAULT_SENDER_NAME: &str = "Usuário";

const ICON_NEW_MESSAGE: &str = "assets/new_message_icon.png";
const ICON_NEW_REQUEST: &str = "assets/new_request_icon.png";
const ICON_ACCEPTED: &str = "assets/acceptance_request_icon.png";
const ICON_REJECTED: &str = "assets/rejected_request_icon.png";
const ICON_SET_ADDRESS: &str = "assets/set_address_icon.png";

const TITLE_CANCELLED: &str = "Troca Cancelada";

/// Notification produced by a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewMessage,
    NewExchangeRequest,
    RequestAccepted,
    RequestRejected,
    AddressDefined,
    AddressChanged,
    CancelledByRequester,
    CancelledByOwner,
    CancelledBeforeAddress,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 9] = [
        NotificationKind::NewMessage,
        NotificationKind::NewExchangeRequest,
        NotificationKind::RequestAccepted,
        NotificationKind::RequestRejected,
        NotificationKind::AddressDefined,
        NotificationKind::AddressChanged,
        NotificationKind::CancelledByRequester,
        NotificationKind::CancelledByOwner,
        NotificationKind::CancelledBeforeAddress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewMessage => "new_message",
            NotificationKind::NewExchangeRequest => "new_exchange_request",
            NotificationKind::RequestAccepted => "request_accepted",
            NotificationKind::RequestRejected => "request_rejected",
            NotificationKind::AddressDefined => "address_defined",
            NotificationKind::AddressChanged => "address_changed",
            NotificationKind::CancelledByRequester => "cancelled_by_requester",
            NotificationKind::CancelledByOwner => "cancelled_by_owner",
            NotificationKind::CancelledBeforeAddress => "cancelled_before_address",
        }
    }

    /// Whether the body mentions the sender's display name
    pub fn needs_sender_name(&self) -> bool {
        matches!(self, NotificationKind::NewMessage)
    }

    pub fn icon(&self) -> &'static str {
        match self {
            NotificationKind::NewMessage => ICON_NEW_MESSAGE,
            NotificationKind::NewExchangeRequest => ICON_NEW_REQUEST,
            NotificationKind::RequestAccepted => ICON_ACCEPTED,
            NotificationKind::AddressDefined | NotificationKind::AddressChanged => {
                ICON_SET_ADDRESS
            }
            NotificationKind::RequestRejected
            | NotificationKind::CancelledByRequester
            | NotificationKind::CancelledByOwner
            | NotificationKind::CancelledBeforeAddress => ICON_REJECTED,
        }
    }

    /// Render title, body and icon for this kind
    pub fn render(&self, ctx: &ContentContext<'_>) -> NotificationContent {
        let title = ctx.book_title;
        let (heading, body) = match self {
            NotificationKind::NewMessage => (
                "Nova Mensagem",
                format!("Você recebeu uma mensagem de {}.", ctx.sender_name),
            ),
            NotificationKind::NewExchangeRequest => (
                "Nova Solicitação de Troca",
                format!("Seu livro \"{}\" recebeu uma oferta de troca.", title),
            ),
            NotificationKind::RequestAccepted => (
                "Pedido Aceito",
                format!("Seu pedido de troca pelo livro \"{}\" foi aceito!", title),
            ),
            NotificationKind::RequestRejected => (
                "Pedido Rejeitado",
                format!("Seu pedido de troca pelo livro \"{}\" foi rejeitado.", title),
            ),
            NotificationKind::AddressDefined => (
                "Endereço Definido",
                "O endereço para sua troca foi definido. Verifique os detalhes na aba Trocas em Andamento."
                    .to_string(),
            ),
            NotificationKind::AddressChanged => (
                "Mudança de Endereço",
                "O endereço para sua troca foi mudado. Verifique os detalhes na aba Trocas em Andamento."
                    .to_string(),
            ),
            NotificationKind::CancelledByRequester => (
                TITLE_CANCELLED,
                format!("A troca pelo seu livro \"{}\" foi cancelada.", title),
            ),
            NotificationKind::CancelledByOwner => (
                TITLE_CANCELLED,
                format!("O proprietário do livro \"{}\" cancelou a troca.", title),
            ),
            NotificationKind::CancelledBeforeAddress => (
                TITLE_CANCELLED,
                format!("A troca pelo livro \"{}\" foi cancelada.", title),
            ),
        };

        NotificationContent {
            title: heading.to_string(),
            body,
            icon: self.icon().to_string(),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values substituted into a notification body
#[derive(Debug, Clone, Copy)]
pub struct ContentContext<'a> {
    pub book_title: &'a str,
    pub sender_name: &'a str,
}

impl Default for ContentContext<'_> {
    fn default() -> Self {
        Self {
            book_title: crate::document::DEFAULT_BOOK_TITLE,
            sender_name: DEFAULT_SENDER_NAME,
        }
    }
}

/// Rendered notification text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub icon: String,
}
