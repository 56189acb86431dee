use super::RemoteCommand;

/// Non-interactive certificate request through the nginx plugin.
///
/// Only renews when the current certificate is close to expiry and allows
/// the certificate's domain set to grow.
pub fn issue(domain: &str, email: &str) -> RemoteCommand {
    RemoteCommand::new("certbot")
        .args(["--nginx", "--non-interactive", "--agree-tos"])
        .arg("--email")
        .arg(email)
        .arg("-d")
        .arg(domain)
        .args(["--keep-until-expiring", "--expand"])
        .describe("Obtaining SSL certificate with certbot")
        .allow_failure()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_is_non_interactive() {
        let cmd = issue("blog.example.com", "me@example.com");
        assert_eq!(
            cmd.line(),
            "certbot --nginx --non-interactive --agree-tos --email me@example.com \
             -d blog.example.com --keep-until-expiring --expand"
        );
        assert!(cmd.allows_failure());
    }
}
