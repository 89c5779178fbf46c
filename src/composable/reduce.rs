/// Argument passed to reduction functions: the accumulated value so far and
/// the value just accepted.
///
/// # Example
/// ```
/// use reflow::Reduce;
///
/// let step = Reduce { last: 10, next: 3 };
/// assert_eq!(step.last + step.next, 13);
/// ```
#[derive(Clone, Debug)]
pub struct Reduce<T, V> {
    /// The accumulated value.
    pub last: V,
    /// The next input value.
    pub next: T,
}
