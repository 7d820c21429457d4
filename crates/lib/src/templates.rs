//! Template registry: the fixed copywriting modes ("GPTs") a chat can run in.
//!
//! Each template carries the welcome text shown at the top of a fresh conversation, the
//! input placeholder, an optional seed input and a short list of suggested prompts.
//! The registry is static; unknown identifiers resolve to the first template.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a copywriting template. Serialized with the wire names the generation
/// gateway expects (e.g. `sales-letter`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateId {
    Linkedin,
    SalesLetter,
    Landing,
    Ads,
    WelcomeSequence,
    PreWebinar,
    PostWebinar,
}

impl TemplateId {
    /// All identifiers in registry order. The first one is the fallback.
    pub const ALL: [TemplateId; 7] = [
        TemplateId::Linkedin,
        TemplateId::SalesLetter,
        TemplateId::Landing,
        TemplateId::Ads,
        TemplateId::WelcomeSequence,
        TemplateId::PreWebinar,
        TemplateId::PostWebinar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::Linkedin => "linkedin",
            TemplateId::SalesLetter => "sales-letter",
            TemplateId::Landing => "landing",
            TemplateId::Ads => "ads",
            TemplateId::WelcomeSequence => "welcome-sequence",
            TemplateId::PreWebinar => "pre-webinar",
            TemplateId::PostWebinar => "post-webinar",
        }
    }

    /// Lenient lookup: unknown names fall back to the first template instead of failing.
    pub fn resolve(name: &str) -> TemplateId {
        name.parse().unwrap_or_else(|_| {
            log::warn!(
                "templates: unknown template {:?}, falling back to {}",
                name,
                TemplateId::ALL[0]
            );
            TemplateId::ALL[0]
        })
    }

    /// Static configuration for this template.
    pub fn config(&self) -> &'static TemplateConfig {
        // TEMPLATES follows declaration order.
        &TEMPLATES[*self as usize]
    }
}

impl Default for TemplateId {
    fn default() -> Self {
        TemplateId::ALL[0]
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown template: {0}")]
pub struct TemplateParseError(pub String);

impl FromStr for TemplateId {
    type Err = TemplateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        TemplateId::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TemplateParseError(s.to_string()))
    }
}

/// Fixed presentation and seed data for one template.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
    pub id: TemplateId,
    /// Display name shown in the dashboard navigation.
    pub name: &'static str,
    pub welcome_message: &'static str,
    pub placeholder: &'static str,
    /// Text the input box starts with after a reset. May be empty.
    pub default_input: &'static str,
    pub suggestions: &'static [&'static str],
}

/// Lenient lookup by name; see [`TemplateId::resolve`].
pub fn lookup(name: &str) -> &'static TemplateConfig {
    TemplateId::resolve(name).config()
}

/// Every template, in registry order.
pub fn all() -> &'static [TemplateConfig] {
    &TEMPLATES
}

static TEMPLATES: [TemplateConfig; 7] = [
    TemplateConfig {
        id: TemplateId::Linkedin,
        name: "Posts de LinkedIn",
        welcome_message: "¡Hola! 👋 Soy tu asistente para crear posts de LinkedIn que generan engagement. Ya tengo acceso a toda la información de tu cliente ideal, tu tono, tu historia y tu especialización. Pulsa Enter para empezar.",
        placeholder: "Pulsa Enter para empezar...",
        default_input: "Quiero mi post",
        suggestions: &[
            "Quiero mi post para el lunes",
            "Quiero mi post para el martes",
            "Quiero mi post para el miércoles",
            "Quiero mi post para el jueves",
        ],
    },
    TemplateConfig {
        id: TemplateId::SalesLetter,
        name: "Cartas de Venta",
        welcome_message: "¡Hola! 📝 Soy tu asistente para crear cartas de venta persuasivas. Cuéntame sobre tu producto/servicio, tu público objetivo y qué problema resuelves.",
        placeholder: "Ej: Vendo un curso de marketing digital para coaches...",
        default_input: "",
        suggestions: &[
            "Carta para lanzamiento de curso",
            "Carta para servicio de consultoría",
            "Carta para producto físico",
            "Carta para membresía",
        ],
    },
    TemplateConfig {
        id: TemplateId::Landing,
        name: "Páginas de Registro",
        welcome_message: "¡Hola! 🚀 Soy tu asistente para crear copy de páginas de registro/landing. Cuéntame qué ofreces y qué acción quieres que tome el visitante.",
        placeholder: "Ej: Landing para captar leads de un webinar gratuito...",
        default_input: "",
        suggestions: &[
            "Landing para webinar",
            "Landing para lead magnet",
            "Landing de producto",
            "Landing de servicios",
        ],
    },
    TemplateConfig {
        id: TemplateId::Ads,
        name: "Guiones de Ads",
        welcome_message: "¡Hola! 🎬 Soy tu asistente para crear guiones de anuncios. Cuéntame para qué plataforma es (Facebook, YouTube, TikTok...) y qué vendes.",
        placeholder: "Ej: Anuncio de Facebook para mi curso de cocina...",
        default_input: "",
        suggestions: &[
            "Anuncio de Facebook/Instagram",
            "Anuncio de YouTube",
            "Anuncio de TikTok",
            "Anuncio de Google",
        ],
    },
    TemplateConfig {
        id: TemplateId::WelcomeSequence,
        name: "Secuencia Bienvenida",
        welcome_message: "¡Hola! ✉️ Soy tu asistente para crear secuencias de emails de bienvenida. Cuéntame sobre tu negocio y qué quieres lograr con estos emails.",
        placeholder: "Ej: Secuencia de 5 emails para nuevos suscriptores de mi newsletter...",
        default_input: "",
        suggestions: &[
            "Secuencia de 3 emails",
            "Secuencia de 5 emails",
            "Secuencia de 7 emails",
            "Email de bienvenida único",
        ],
    },
    TemplateConfig {
        id: TemplateId::PreWebinar,
        name: "Emails Pre-Webinar",
        welcome_message: "¡Hola! 📅 Soy tu asistente para crear emails pre-webinar que aumentan la asistencia. Cuéntame sobre tu webinar y cuándo es.",
        placeholder: "Ej: Webinar sobre inversiones el próximo martes...",
        default_input: "",
        suggestions: &[
            "Email de confirmación",
            "Email recordatorio 24h antes",
            "Email recordatorio 1h antes",
            "Secuencia completa pre-webinar",
        ],
    },
    TemplateConfig {
        id: TemplateId::PostWebinar,
        name: "Emails Post-Webinar",
        welcome_message: "¡Hola! 🎯 Soy tu asistente para crear emails post-webinar que convierten. Cuéntame sobre tu webinar y qué vendes al final.",
        placeholder: "Ej: Emails de seguimiento para vender mi programa de mentoría...",
        default_input: "",
        suggestions: &[
            "Email de replay",
            "Email de urgencia",
            "Email de cierre de carrito",
            "Secuencia completa post-webinar",
        ],
    },
];
