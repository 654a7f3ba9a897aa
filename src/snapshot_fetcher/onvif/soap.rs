//! SOAP 1.2 envelopes with WS-Security UsernameToken digest

use super::xml;
use base64::Engine;
use sha1::{Digest, Sha1};

pub const DEVICE_WSDL: &str = "http://www.onvif.org/ver10/device/wsdl";
pub const MEDIA_WSDL: &str = "http://www.onvif.org/ver10/media/wsdl";

/// PasswordDigest = Base64(SHA1(nonce + created + password))
pub fn password_digest(nonce: &[u8], created: &str, password: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce);
    hasher.update(created.as_bytes());
    hasher.update(password.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// `<s:Header>` carrying a fresh UsernameToken
pub fn security_header(username: &str, password: &str) -> String {
    let nonce: [u8; 16] = rand::random();
    let created = chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string();
    security_header_with(username, password, &nonce, &created)
}

fn security_header_with(username: &str, password: &str, nonce: &[u8], created: &str) -> String {
    let digest = password_digest(nonce, created, password);
    let nonce_b64 = base64::engine::general_purpose::STANDARD.encode(nonce);

    format!(
        r#"<s:Header>
    <Security xmlns="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd" s:mustUnderstand="true">
      <UsernameToken>
        <Username>{}</Username>
        <Password Type="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordDigest">{}</Password>
        <Nonce EncodingType="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary">{}</Nonce>
        <Created xmlns="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd">{}</Created>
      </UsernameToken>
    </Security>
  </s:Header>"#,
        xml::escape(username),
        digest,
        nonce_b64,
        created
    )
}

/// Full authenticated envelope around `body`
pub fn envelope(username: &str, password: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
  {}
  <s:Body>
    {}
  </s:Body>
</s:Envelope>"#,
        security_header(username, password),
        body
    )
}

pub fn get_capabilities_body() -> String {
    format!(
        r#"<GetCapabilities xmlns="{}"><Category>Media</Category></GetCapabilities>"#,
        DEVICE_WSDL
    )
}

pub fn get_profiles_body() -> String {
    format!(r#"<GetProfiles xmlns="{}"/>"#, MEDIA_WSDL)
}

pub fn get_snapshot_uri_body(profile_token: &str) -> String {
    format!(
        r#"<GetSnapshotUri xmlns="{}"><ProfileToken>{}</ProfileToken></GetSnapshotUri>"#,
        MEDIA_WSDL,
        xml::escape(profile_token)
    )
}
