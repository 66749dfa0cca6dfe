//! Generation-counted values and memoized derivations.
//!
//! A [`NotifiedState`] bumps its generation on every mutation; a [`Memo`]
//! remembers the generation it was derived from and only reruns its
//! derivation when that generation moves.

pub trait Dependency {
    type Value: ?Sized;

    fn generation(&self) -> usize;
    fn value(&self) -> &Self::Value;
}

pub struct NotifiedState<T> {
    value: T,
    generation: usize,
}

impl<T> Dependency for NotifiedState<T> {
    type Value = T;

    fn generation(&self) -> usize {
        self.generation
    }

    fn value(&self) -> &T {
        &self.value
    }
}

impl<T> NotifiedState<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            generation: 0,
        }
    }

    pub fn notify(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Mutates the value and bumps the generation.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> R {
        let out = f(&mut self.value);
        self.notify();
        out
    }
}

impl<T> std::default::Default for NotifiedState<T>
where
    T: std::default::Default,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> std::ops::Deref for NotifiedState<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T> std::fmt::Debug for NotifiedState<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifiedState")
            .field("generation", &self.generation)
            .field("value", &self.value)
            .finish()
    }
}

impl<T> From<T> for NotifiedState<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

pub enum Memo<T> {
    Undefined,
    Ready(T, usize),
}

impl<T> Memo<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Memo::Ready(inner, _) => Some(inner),
            Memo::Undefined => None,
        }
    }

    pub fn generation(&self) -> Option<usize> {
        match self {
            Memo::Ready(_, generation) => Some(*generation),
            Memo::Undefined => None,
        }
    }

    /// Returns the cached value, deriving it first if `dep` moved on.
    /// The flag reports whether the derivation ran.
    pub fn refresh<D: Dependency + ?Sized>(
        &mut self,
        dep: &D,
        derive: impl FnOnce(&D::Value) -> T,
    ) -> (&T, bool) {
        let current = dep.generation();
        let fresh = self.generation() != Some(current);
        if fresh {
            *self = Memo::Ready(derive(dep.value()), current);
        }
        match self {
            Memo::Ready(inner, _) => (inner, fresh),
            Memo::Undefined => unreachable!("memo populated above"),
        }
    }

    pub fn invalidate(&mut self) {
        *self = Memo::Undefined;
    }
}

impl<T> std::default::Default for Memo<T> {
    fn default() -> Self {
        Memo::Undefined
    }
}

impl<T> std::fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Memo::Undefined => write!(f, "Undefined"),
            Memo::Ready(_, generation) => write!(f, "Ready({generation})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memo_reruns_only_when_generation_moves() {
        let mut source = NotifiedState::new(vec![1, 2, 3]);
        let mut memo: Memo<i32> = Memo::default();
        let mut runs = 0;

        let (sum, fresh) = memo.refresh(&source, |v| {
            runs += 1;
            v.iter().sum()
        });
        assert_eq!((*sum, fresh), (6, true));

        let (_, fresh) = memo.refresh(&source, |v| {
            runs += 1;
            v.iter().sum()
        });
        assert!(!fresh);

        source.update(|v| v.push(4));
        let (sum, fresh) = memo.refresh(&source, |v| {
            runs += 1;
            v.iter().sum()
        });
        assert_eq!((*sum, fresh), (10, true));
        assert_eq!(runs, 2);
    }

    #[test]
    fn invalidate_forces_recompute() {
        let source = NotifiedState::new(1u8);
        let mut memo = Memo::default();
        memo.refresh(&source, |v| *v);
        memo.invalidate();
        assert!(memo.ready().is_none());
        let (_, fresh) = memo.refresh(&source, |v| *v);
        assert!(fresh);
    }
}
