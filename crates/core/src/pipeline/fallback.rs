use super::Strategy;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use storyvault_api::{CanonicalKey, ResolutionSource, ResolveResult, Resolved};

pub const PLACEHOLDER_TEXT: &str = "Esta historia no está disponible en este momento. \
Vuelve a intentarlo más tarde.";

static STORY_TEXTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (
            "dragon-no-volar.txt",
            "Había una vez un pequeño dragón que no sabía volar. Todos los días \
miraba a sus hermanos surcar el cielo y suspiraba. Un día descubrió que, \
aunque sus alas eran pequeñas, su corazón era enorme. Con la ayuda de sus \
amigos del bosque aprendió que cada uno tiene su propio tiempo para volar.",
        ),
        (
            "dragon-share.txt",
            "El dragón Lucas guardaba todos sus juguetes en una cueva. Nadie podía \
tocarlos. Una tarde de lluvia se sintió muy solo y entendió que jugar con \
otros era mucho más divertido. Desde entonces, la cueva de Lucas se llenó \
de risas.",
        ),
        (
            "osito-valiente.txt",
            "El osito Tomás tenía miedo a la oscuridad. Su abuela le regaló una \
linterna con forma de estrella y le contó que la noche también cuida de los \
que duermen. Esa noche, Tomás apagó la linterna y sonrió.",
        ),
        (
            "luna-curiosa.txt",
            "La luna quería saber qué pasaba en la Tierra durante el día. Le pidió \
al sol que le contara, y el sol le habló de parques, escuelas y mercados. \
Desde entonces, la luna sale un poquito antes para ver a los niños jugar.",
        ),
    ])
});

/// Built-in text for `file_name`, if the story is part of the bundled
/// catalogue.
pub fn story_text(file_name: &str) -> Option<&'static str> {
    STORY_TEXTS.get(file_name).copied()
}

/// Terminal text strategy. Never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct Builtin;

#[async_trait]
impl Strategy<String> for Builtin {
    fn name(&self) -> &'static str {
        "builtin"
    }

    async fn attempt(&self, key: &CanonicalKey) -> ResolveResult<Resolved<String>> {
        let text = story_text(key.file_name()).unwrap_or(PLACEHOLDER_TEXT);
        Ok(Resolved::fallback(text.to_string(), ResolutionSource::Builtin))
    }
}
