// src/integrations/signature.rs

// Verificação HMAC-SHA256 dos webhooks. Sem segredo configurado, a
// verificação é desligada (ambiente de desenvolvimento).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::common::error::AppError;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &str, parts: &[&[u8]]) -> Result<HmacSha256, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("chave HMAC inválida: {}", e))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac)
}

/// Gateway de pagamento: hex(HMAC(secret, timestamp || body)).
pub fn verify_payment_signature(
    secret: Option<&str>,
    timestamp: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
) -> Result<(), AppError> {
    let Some(secret) = secret else {
        return Ok(());
    };
    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return Err(AppError::InvalidSignature);
    };
    let expected = hex::decode(signature.trim()).map_err(|_| AppError::InvalidSignature)?;

    mac_for(secret, &[timestamp.as_bytes(), body])?
        .verify_slice(&expected)
        .map_err(|_| AppError::InvalidSignature)
}

/// Assinatura eletrônica: base64(HMAC(secret, body)).
pub fn verify_esign_signature(secret: Option<&str>, signature: Option<&str>, body: &[u8]) -> Result<(), AppError> {
    let Some(secret) = secret else {
        return Ok(());
    };
    let signature = signature.ok_or(AppError::InvalidSignature)?;
    let expected = STANDARD
        .decode(signature.trim())
        .map_err(|_| AppError::InvalidSignature)?;

    mac_for(secret, &[body])?
        .verify_slice(&expected)
        .map_err(|_| AppError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_hex(secret: &str, ts: &str, body: &[u8]) -> String {
        let mac = mac_for(secret, &[ts.as_bytes(), body]).unwrap();
        hex::encode(mac.finalize().into_bytes())
    }

    fn sign_b64(secret: &str, body: &[u8]) -> String {
        let mac = mac_for(secret, &[body]).unwrap();
        STANDARD.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn payment_signature_round_trips() {
        let body = br#"{"name":"payment_intent.succeeded"}"#;
        let sig = sign_hex("whsec", "1700000000", body);
        assert!(verify_payment_signature(Some("whsec"), Some("1700000000"), Some(&sig), body).is_ok());
    }

    #[test]
    fn tampered_body_is_rejected() {
        let sig = sign_hex("whsec", "1700000000", b"{}");
        let result = verify_payment_signature(Some("whsec"), Some("1700000000"), Some(&sig), b"{\"x\":1}");
        assert!(matches!(result, Err(AppError::InvalidSignature)));
    }

    #[test]
    fn missing_headers_are_rejected_when_secret_is_set() {
        assert!(matches!(
            verify_payment_signature(Some("whsec"), None, None, b"{}"),
            Err(AppError::InvalidSignature)
        ));
        assert!(matches!(
            verify_esign_signature(Some("k"), None, b"{}"),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn verification_is_skipped_without_secret() {
        assert!(verify_payment_signature(None, None, None, b"anything").is_ok());
        assert!(verify_esign_signature(None, None, b"anything").is_ok());
    }

    #[test]
    fn esign_signature_round_trips() {
        let body = br#"{"event":"envelope-completed"}"#;
        let sig = sign_b64("connect-key", body);
        assert!(verify_esign_signature(Some("connect-key"), Some(&sig), body).is_ok());
    }
}
