/// Drops payment method types that cannot settle in the given currency.
///
/// Several method types only exist in one currency (iDEAL and Bancontact are EUR-only, ACH debit
/// is USD-only). Passing one of those alongside an incompatible currency makes the intent
/// creation call fail outright, so the storefront's wishlist is filtered before it reaches the
/// payment authority. An empty result falls back to card payments, which settle in any currency.
pub fn filter_method_types(currency: &str, requested: &[String]) -> Vec<String> {
    let currency = currency.to_ascii_lowercase();
    let compatible = |method: &str| match method {
        "ideal" | "bancontact" | "eps" | "sepa_debit" => currency == "eur",
        "us_bank_account" => currency == "usd",
        "acss_debit" => currency == "cad" || currency == "usd",
        _ => true,
    };
    let mut filtered: Vec<String> = requested.iter().filter(|m| compatible(m)).cloned().collect();
    if filtered.is_empty() {
        filtered.push("card".to_string());
    }
    filtered
}
