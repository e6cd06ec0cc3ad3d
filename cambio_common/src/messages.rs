//! User-facing texts and keyboard layout.
//!
//! Every prompt the assistant sends lives here so the dialogue reads as a sequence
//! of transitions rather than string literals.

/// Prompt sent on start and restart, together with the origin keyboard.
pub const WELCOME: &str = "¡Bienvenido! Selecciona la moneda o saldo que deseas cambiar (Origen).";
/// Prompt sent after an origin is chosen, together with the destination keyboard.
pub const ASK_DESTINATION: &str = "Selecciona la moneda o saldo que deseas recibir (Destino).";
/// Prompt sent after a destination is chosen.
pub const ASK_AMOUNT: &str = "Ingresa el monto que deseas cambiar.";
/// Reply to an amount that is not a number.
pub const INVALID_AMOUNT: &str = "Por favor ingresa un monto válido en números.";
/// Reply when the market rate could not be fetched.
pub const MARKET_RATE_UNAVAILABLE: &str = "Error al obtener la cotización del dólar blue.";
/// Reply when the reference table has no entry for the pair.
pub const NO_RATE_FOR_PAIR: &str = "No se encontró una tasa de cambio para esta combinación.";
/// Prompt sent after a quote, together with the final keyboard.
pub const ASK_NEXT_STEP: &str = "¿Deseas continuar con la transacción o realizar otra consulta?";
/// Reply when the user asks to continue with an operator.
pub const HAND_OFF: &str = "Serás derivado a un operador para continuar con la transacción. ¡Gracias!";

/// Final keyboard button: hand off to an operator.
pub const CONTINUE_BUTTON: &str = "Continuar con la transacción";
/// Final keyboard button: restart the flow.
pub const RESTART_BUTTON: &str = "Realizar otra consulta";

/// Buttons per keyboard row.
pub const ROW_WIDTH: usize = 3;

/// Quote announcement, e.g. `El cambio de 100.0 USD a PESOS es 95000.00.`
///
/// The amount is printed like a float literal so whole numbers keep their `.0`
/// (see [`float_literal`]).
pub fn quote_message(amount: f64, origin: &str, destination: &str, value: f64) -> String {
    format!(
        "El cambio de {} {} a {} es {:.2}.",
        float_literal(amount),
        origin.to_uppercase(),
        destination.to_uppercase(),
        value
    )
}

/// Shortest float literal for `value`: `10000.0`, `2.5`, and outside
/// `[1e-4, 1e16)` a signed two-digit exponent such as `1e+16` or `1.5e-05`.
pub fn float_literal(value: f64) -> String {
    let magnitude = value.abs();
    if value == 0.0 || !value.is_finite() || (1e-4..1e16).contains(&magnitude) {
        return format!("{:?}", value);
    }
    let exp = format!("{:e}", value);
    match exp.split_once('e') {
        Some((mantissa, exponent)) => match exponent.strip_prefix('-') {
            Some(digits) => format!("{}e-{:0>2}", mantissa, digits),
            None => format!("{}e+{:0>2}", mantissa, exponent),
        },
        None => exp,
    }
}

/// Split `options` into keyboard rows of `width` buttons.
pub fn keyboard_rows(options: &[String], width: usize) -> Vec<Vec<String>> {
    options
        .chunks(width.max(1))
        .map(|row| row.to_vec())
        .collect()
}
