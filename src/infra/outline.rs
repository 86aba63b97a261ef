//! HTTP client for the Outline key-management API.
//!
//! Outline servers present a self-signed certificate, so ordinary chain
//! verification cannot work; the connection is instead pinned to the
//! SHA-256 fingerprint of the server certificate from configuration.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::Url;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::vpn::{VpnKey, VpnKeyService},
    infra::{config::OutlineConfig, error::InfraError},
};

/// TCP handshake + TLS budget; the overall request budget comes from config.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct OutlineClient {
    base_url: Url,
    fingerprint: [u8; 32],
    timeout: Duration,
    /// Built on first use; every later request reuses the same client and
    /// its connection pool.
    client: OnceCell<Client>,
}

impl OutlineClient {
    pub fn new(config: &OutlineConfig) -> Result<Self, InfraError> {
        let fingerprint = parse_fingerprint(&config.cert_sha256)?;
        Ok(Self {
            base_url: config.api_url.clone(),
            fingerprint,
            timeout: config.timeout,
            client: OnceCell::new(),
        })
    }

    fn client(&self) -> AppResult<&Client> {
        self.client.get_or_try_init(|| {
            let provider = Arc::new(rustls::crypto::ring::default_provider());
            let tls = rustls::ClientConfig::builder_with_provider(provider)
                .with_safe_default_protocol_versions()
                .map_err(|e| AppError::Provisioning(format!("TLS setup failed: {e}")))?
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(PinnedCertVerifier {
                    fingerprint: self.fingerprint,
                }))
                .with_no_client_auth();

            Client::builder()
                .use_preconfigured_tls(tls)
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(self.timeout)
                .build()
                .map_err(|e| AppError::Provisioning(format!("failed to build key server client: {e}")))
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }
}

#[async_trait]
impl VpnKeyService for OutlineClient {
    async fn create_key(&self, label: &str) -> AppResult<VpnKey> {
        let client = self.client()?;
        let response = client
            .post(self.endpoint("access-keys"))
            .json(&serde_json::json!({ "name": label }))
            .send()
            .await
            .map_err(|e| AppError::Provisioning(format!("key server request failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::Provisioning(format!("key server rejected request: {e}")))?;

        let key: AccessKeyResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provisioning(format!("malformed key server response: {e}")))?;

        Ok(VpnKey {
            id: key.id,
            access_url: key.access_url,
            port: key.port,
        })
    }
}

#[derive(Debug, Deserialize)]
struct AccessKeyResponse {
    id: String,
    #[serde(rename = "accessUrl")]
    access_url: String,
    #[serde(default)]
    port: Option<u16>,
}

fn parse_fingerprint(hex_value: &str) -> Result<[u8; 32], InfraError> {
    let cleaned: String = hex_value
        .chars()
        .filter(|c| *c != ':' && !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let bytes = hex::decode(&cleaned).map_err(|_| InfraError::CertFingerprint)?;
    bytes.try_into().map_err(|_| InfraError::CertFingerprint)
}

/// Accepts exactly the certificate whose SHA-256 digest matches the pinned
/// fingerprint, regardless of chain or hostname.
#[derive(Debug)]
struct PinnedCertVerifier {
    fingerprint: [u8; 32],
}

impl rustls::client::danger::ServerCertVerifier for PinnedCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        let digest = Sha256::digest(end_entity.as_ref());
        if digest.as_slice() == self.fingerprint.as_slice() {
            Ok(rustls::client::danger::ServerCertVerified::assertion())
        } else {
            Err(rustls::Error::InvalidCertificate(
                rustls::CertificateError::ApplicationVerificationFailure,
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FINGERPRINT: &str = "9F86D081884C7D659A2FEAA0C55AD015A3BF4F1B2B0B822CD15D6C15B0F00A08";

    #[test]
    fn fingerprint_accepts_colon_separated_uppercase() {
        let plain = parse_fingerprint(FINGERPRINT).unwrap();
        let separated = FINGERPRINT
            .as_bytes()
            .chunks(2)
            .map(|pair| std::str::from_utf8(pair).unwrap())
            .collect::<Vec<_>>()
            .join(":");
        assert_eq!(parse_fingerprint(&separated).unwrap(), plain);
    }

    #[test]
    fn fingerprint_rejects_wrong_length_and_non_hex() {
        assert!(parse_fingerprint("abcdef").is_err());
        assert!(parse_fingerprint(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn access_key_response_parses_outline_shape() {
        let key: AccessKeyResponse = serde_json::from_str(
            r#"{"id":"7","name":"tg-555","accessUrl":"ss://abc@host:443/?outline=1","port":443}"#,
        )
        .unwrap();
        assert_eq!(key.id, "7");
        assert_eq!(key.port, Some(443));

        let no_port: AccessKeyResponse =
            serde_json::from_str(r#"{"id":"8","accessUrl":"ss://def@host"}"#).unwrap();
        assert_eq!(no_port.port, None);
    }

    #[test]
    fn verifier_pins_exact_certificate_bytes() {
        let cert_bytes = b"not-a-real-der-cert".to_vec();
        let digest: [u8; 32] = Sha256::digest(&cert_bytes).into();
        let verifier = PinnedCertVerifier {
            fingerprint: digest,
        };

        use rustls::client::danger::ServerCertVerifier;
        let cert = rustls::pki_types::CertificateDer::from(cert_bytes.clone());
        let name = rustls::pki_types::ServerName::try_from("vpn.example").unwrap();
        let now = rustls::pki_types::UnixTime::now();

        assert!(
            verifier
                .verify_server_cert(&cert, &[], &name, &[], now)
                .is_ok()
        );

        let other = rustls::pki_types::CertificateDer::from(b"tampered".to_vec());
        assert!(verifier.verify_server_cert(&other, &[], &name, &[], now).is_err());
    }
}
