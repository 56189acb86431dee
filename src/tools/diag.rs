use super::RemoteCommand;
use crate::utils::shell_escape;

/// HTTP status code of `url`, printed by curl
pub fn http_status(url: &str) -> RemoteCommand {
    RemoteCommand::new("curl")
        .args(["-s", "-o", "/dev/null", "-w", "%{http_code}", "--max-time", "5"])
        .arg(url)
        .allow_failure()
}

/// `notBefore=`/`notAfter=` lines of the certificate served for `domain`
pub fn certificate_dates(domain: &str) -> RemoteCommand {
    let domain = shell_escape(domain);
    RemoteCommand::shell(format!(
        "echo | openssl s_client -servername {d} -connect {d}:443 2>/dev/null | openssl x509 -noout -dates",
        d = domain
    ))
    .allow_failure()
}

pub fn disk_usage() -> RemoteCommand {
    RemoteCommand::new("df").args(["-h", "/"]).allow_failure()
}
