//! Apache rewrite rules that send unmatched requests to the SPA entry point.

/// Name the routing file is stored under in the remote root.
pub const HTACCESS_NAME: &str = ".htaccess";

/// Renders the `.htaccess` for an application served under `rewrite_base`.
///
/// `/` suits a site on its own (sub)domain, `/app/` one served from a
/// sub-path. Missing leading or trailing slashes are added.
pub fn htaccess(rewrite_base: &str) -> String {
    let base = normalize_base(rewrite_base);
    format!(
        "RewriteEngine On\n\
         RewriteBase {base}\n\
         RewriteCond %{{REQUEST_FILENAME}} !-f\n\
         RewriteCond %{{REQUEST_FILENAME}} !-d\n\
         RewriteRule . {base}index.html [L]\n",
        base = base
    )
}

fn normalize_base(base: &str) -> String {
    let trimmed = base.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else {
        format!("/{}/", trimmed)
    }
}
