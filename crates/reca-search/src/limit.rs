#[derive(Debug, Clone)]
pub enum Limit {
    Levels(usize),
    Seconds(f64),
    Models(usize),
}
