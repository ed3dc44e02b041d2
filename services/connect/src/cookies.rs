//! Provider token cookies

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::{
    oauth::TokenGrant,
    providers::{ProviderId, ProviderSettings, REFRESH_TOKEN_TTL},
};

pub fn access_cookie_name(provider: ProviderId) -> String {
    format!("{}_access_token", provider.cookie_prefix())
}

pub fn refresh_cookie_name(provider: ProviderId) -> String {
    format!("{}_refresh_token", provider.cookie_prefix())
}

/// Access-token lifetime: what the provider stated, else the provider default
pub fn access_ttl(settings: &ProviderSettings, grant: &TokenGrant) -> u64 {
    grant.expires_in.unwrap_or(settings.default_access_ttl)
}

fn token_cookie(name: String, value: String, max_age: u64, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(i64::try_from(max_age).unwrap_or(i64::MAX)))
        .build()
}

/// Add the access cookie and, when present, the refresh cookie
pub fn set_token_cookies(
    jar: CookieJar,
    settings: &ProviderSettings,
    grant: &TokenGrant,
    secure: bool,
) -> CookieJar {
    let jar = jar.add(token_cookie(
        access_cookie_name(settings.id),
        grant.access_token.clone(),
        access_ttl(settings, grant),
        secure,
    ));

    match &grant.refresh_token {
        Some(refresh_token) => jar.add(token_cookie(
            refresh_cookie_name(settings.id),
            refresh_token.clone(),
            REFRESH_TOKEN_TTL,
            secure,
        )),
        None => jar,
    }
}

/// Expire both token cookies of a provider
pub fn clear_token_cookies(jar: CookieJar, provider: ProviderId) -> CookieJar {
    jar.remove(Cookie::build((access_cookie_name(provider), "")).path("/"))
        .remove(Cookie::build((refresh_cookie_name(provider), "")).path("/"))
}
