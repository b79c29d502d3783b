//! Minimal robots.txt support: the `*` group only, longest-match precedence.

#[derive(Debug, Clone, Default)]
pub struct Robots {
    allows: Vec<String>,
    disallows: Vec<String>,
    pub crawl_delay_ms: Option<u64>,
}

impl Robots {
    pub fn parse(txt: &str) -> Self {
        let mut active = false;
        let mut rules = Robots::default();
        for line in txt.lines() {
            let l = line.split('#').next().unwrap_or("").trim();
            if l.is_empty() { continue; }
            if let Some((k, v)) = l.split_once(':') {
                let val = v.trim();
                match k.trim().to_lowercase().as_str() {
                    "user-agent" => { active = val == "*"; }
                    "allow" if active && !val.is_empty() => rules.allows.push(val.to_string()),
                    "disallow" if active && !val.is_empty() => rules.disallows.push(val.to_string()),
                    "crawl-delay" if active => {
                        if let Ok(n) = val.parse::<f64>() { rules.crawl_delay_ms = Some((n * 1000.0) as u64); }
                    }
                    _ => {}
                }
            }
        }
        rules
    }

    pub fn len(&self) -> usize { self.allows.len() + self.disallows.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Longest matching Allow beats a shorter or equal Disallow.
    pub fn allows(&self, path: &str) -> bool {
        let longest = |rules: &[String]| rules.iter().filter(|r| path.starts_with(r.as_str())).map(|r| r.len()).max();
        match (longest(&self.allows), longest(&self.disallows)) {
            (Some(a), Some(d)) => a >= d,
            (_, None) => true,
            (None, Some(_)) => false,
        }
    }
}
