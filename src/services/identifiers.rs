use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

const NAME_ADJECTIVES: &[&str] = &["turbo", "ultra", "pro", "max", "premium", "advanced", "studio"];
const NAME_NOUNS: &[&str] = &["render", "modeler", "designer", "workstation", "visualizer", "creator", "artist"];
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 17;

/// Source of client-side identifiers and instance names.
pub trait IdentifierSource: Send + Sync {
    /// Id for a record created locally, before the backend assigns one.
    fn instance_id(&self) -> String;
    /// Id shared by a principal and the accelerators deployed with it.
    fn group_id(&self) -> String;
    /// Human-readable name sent with deploy requests.
    fn instance_name(&self) -> String;
}

/// Random identifiers for production use.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdentifiers;

impl IdentifierSource for RandomIdentifiers {
    fn instance_id(&self) -> String {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ID_LEN)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        format!("i-{}", suffix)
    }

    fn group_id(&self) -> String {
        format!("group-{}", chrono::Utc::now().timestamp_millis())
    }

    fn instance_name(&self) -> String {
        let mut rng = rand::thread_rng();
        let adjective = NAME_ADJECTIVES[rng.gen_range(0..NAME_ADJECTIVES.len())];
        let noun = NAME_NOUNS[rng.gen_range(0..NAME_NOUNS.len())];
        format!("vw-{}-{}-{}", adjective, noun, rng.gen_range(0..1000))
    }
}

/// Deterministic identifiers: `i-local-1`, `group-2`, `vw-test-3`, ...
///
/// A single counter feeds all three kinds, so values never collide.
#[derive(Debug, Default)]
pub struct SequentialIdentifiers {
    counter: AtomicU64,
}

impl SequentialIdentifiers {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl IdentifierSource for SequentialIdentifiers {
    fn instance_id(&self) -> String {
        format!("i-local-{}", self.next())
    }

    fn group_id(&self) -> String {
        format!("group-{}", self.next())
    }

    fn instance_name(&self) -> String {
        format!("vw-test-{}", self.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_instance_id_shape() {
        let id = RandomIdentifiers.instance_id();
        assert!(id.starts_with("i-"));
        assert_eq!(id.len(), 2 + ID_LEN);
        assert!(id[2..].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_random_name_shape() {
        let name = RandomIdentifiers.instance_name();
        let parts: Vec<&str> = name.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "vw");
        assert!(NAME_ADJECTIVES.contains(&parts[1]));
        assert!(NAME_NOUNS.contains(&parts[2]));
        assert!(parts[3].parse::<u32>().unwrap() < 1000);
    }

    #[test]
    fn test_sequential_ids_are_distinct() {
        let ids = SequentialIdentifiers::new();
        assert_eq!(ids.instance_id(), "i-local-1");
        assert_eq!(ids.group_id(), "group-2");
        assert_eq!(ids.instance_name(), "vw-test-3");
    }
}
