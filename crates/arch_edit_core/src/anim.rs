//! Animation definitions: named lists of face names with an optional
//! facing count, looked up per direction at display time.

use std::collections::HashMap;

/// One animation: the raw face-name list plus the extracted frame table.
///
/// The list is `\n`-terminated lines, one face name per line, optionally
/// led by a `facings <n>` line. With facings the list is split into one
/// group per facing and the first face of each group becomes that
/// facing's display frame. Without facings the list is a plain picture
/// list and every face is a frame, capped at 9 entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animation {
    name: String,
    text: String,
    facings: i32,
    frames: Vec<String>,
}

impl Animation {
    pub fn new(name: impl Into<String>, list: impl Into<String>) -> Self {
        let name = name.into();
        let text = list.into();

        // Every line of interest ends in '\n'; an unterminated final line
        // is not part of the list.
        let mut lines: Vec<&str> = text.split('\n').collect();
        lines.pop();

        let face_count = text.bytes().filter(|&b| b == b'\n').count() as i32;
        let mut facings = 0;
        for line in &lines {
            if let Some(rest) = line.strip_prefix("facings ") {
                facings = rest.trim().parse().unwrap_or(0);
            }
        }

        // With facings the first line is the facings statement itself, so
        // the countdown starts past it.
        let (group, mut countdown, mut cap) = if facings > 0 {
            ((face_count - 1) / facings, 2, -1)
        } else {
            (1, 1, face_count.min(9))
        };

        let mut frames = Vec::new();
        for line in lines.into_iter().filter(|l| !l.is_empty()) {
            countdown -= 1;
            if countdown == 0 {
                frames.push(line.to_string());
                if cap >= 0 {
                    cap -= 1;
                    if cap <= 0 {
                        break;
                    }
                }
                countdown = group;
            }
        }

        Self {
            name,
            text,
            facings,
            frames,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw face-name list this animation was built from.
    pub fn list(&self) -> &str {
        &self.text
    }

    pub fn facings(&self) -> i32 {
        self.facings
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// Display frame for a facing direction, if the list has one.
    pub fn frame(&self, direction: usize) -> Option<&str> {
        self.frames.get(direction).map(String::as_str)
    }
}

/// Name-indexed animation table. Duplicate names resolve to the latest
/// definition.
#[derive(Debug, Clone, Default)]
pub struct AnimationSet {
    animations: Vec<Animation>,
    names: HashMap<String, usize>,
}

impl AnimationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an animation under `name`, returning its index.
    pub fn add(&mut self, name: impl Into<String>, list: impl Into<String>) -> usize {
        let anim = Animation::new(name, list);
        let index = self.animations.len();
        self.names.insert(anim.name.clone(), index);
        self.animations.push(anim);
        index
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    pub fn get(&self, index: usize) -> Option<&Animation> {
        self.animations.get(index)
    }

    /// Display frame of animation `index` for `direction`.
    pub fn frame(&self, index: usize, direction: usize) -> Option<&str> {
        self.animations.get(index)?.frame(direction)
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Animation> {
        self.animations.iter()
    }
}
