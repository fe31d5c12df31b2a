//! Normalización de usernames.
//!
//! `slugify_username` produce un username ASCII apto para el store a partir
//! de cualquier cadena. Es una función total y determinista; las clases de
//! caracteres están fijadas por contrato:
//! - patrón permitido: `^[\w.@+-]+$` con `\w = [A-Za-z0-9_]` sobre el texto
//!   ASCII resultante de la descomposición,
//! - limpieza: se eliminan los caracteres fuera de `[\w\s.@+-]` y luego cada
//!   corrida de espacios/guiones colapsa en un único guion.

use unicode_normalization::UnicodeNormalization;

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_allowed(c: char) -> bool {
    is_word(c) || matches!(c, '.' | '@' | '+' | '-')
}

/// Convierte `value` en un username ASCII seguro.
///
/// Idempotente sobre su propia salida: aplicarla dos veces da lo mismo que
/// aplicarla una vez.
pub fn slugify_username(value: &str) -> String {
    // Descomposición de compatibilidad (NFKD) y descarte del resto no ASCII.
    let ascii: String = value.nfkd().filter(|c| c.is_ascii()).collect();

    // Si ya cumple el patrón permitido se devuelve tal cual.
    if !ascii.is_empty() && ascii.chars().all(is_allowed) {
        return ascii;
    }

    let stripped: String = ascii.chars().filter(|c| is_allowed(*c) || c.is_whitespace()).collect();
    let trimmed = stripped.trim();

    let mut out = String::with_capacity(trimmed.len());
    let mut in_run = false;
    for c in trimmed.chars() {
        if c.is_whitespace() || c == '-' {
            if !in_run {
                out.push('-');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}
