use crate::stages::KNOWN_STAGES;

pub fn list() {
    let width = KNOWN_STAGES.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, about) in KNOWN_STAGES {
        println!("{name:<width$}  {about}");
    }
}
