use crate::constants::UNKNOWN_PROCESS;
use tracing::debug;

/// Имя процесса по pid из /proc; "unknown", если определить не удалось
pub fn process_name(pid: Option<u32>) -> String {
    let Some(pid) = pid else {
        return UNKNOWN_PROCESS.to_string();
    };

    match std::fs::read_to_string(format!("/proc/{}/comm", pid)) {
        Ok(name) if !name.trim().is_empty() => name.trim().to_string(),
        Ok(_) => UNKNOWN_PROCESS.to_string(),
        Err(e) => {
            debug!("Не удалось определить имя процесса {}: {}", pid, e);
            UNKNOWN_PROCESS.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_without_pid() {
        assert_eq!(process_name(None), "unknown");
    }

    #[test]
    fn test_unknown_for_missing_process() {
        assert_eq!(process_name(Some(u32::MAX)), "unknown");
    }

    #[test]
    fn test_own_process_resolves() {
        let name = process_name(Some(std::process::id()));
        assert_ne!(name, "unknown");
        assert!(!name.contains('\n'));
    }
}
