use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub keys: Vec<String>,
}

impl Path {
    pub fn new(keys: Vec<String>) -> Self {
        Path { keys: keys }
    }

    /// A bare `.` stays a single key naming the current context.
    pub fn split(name: &str) -> Self {
        if name == "." {
            return Path::new(vec![String::from(".")]);
        }
        Path::new(name.split('.').map(String::from).collect())
    }

    pub fn is_implicit(&self) -> bool {
        self.keys.len() == 1 && self.keys[0] == "."
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.keys.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::Path;

    #[test]
    fn to_string() {
        let path = Path::new(vec![String::from("one"), String::from("two")]);
        assert_eq!("one.two", path.to_string());
    }

    #[test]
    fn split() {
        let path = Path::split("a.b.c");
        assert_eq!(vec!["a", "b", "c"], path.keys);
    }

    #[test]
    fn split_dot() {
        let path = Path::split(".");
        assert!(path.is_implicit());
    }

    #[test]
    fn split_single() {
        let path = Path::split("name");
        assert_eq!(vec!["name"], path.keys);
    }
}
