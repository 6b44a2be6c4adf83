//! Runtime view of one adapted method invocation.

use std::sync::Arc;

use crate::aside::key::KeyComponent;

/// Everything a [`KeyGenerator`](crate::aside::KeyGenerator) or
/// [`CacheResolver`](crate::aside::CacheResolver) may inspect about the
/// current call: the method name, its arguments, and which argument
/// positions are key-marked.
///
/// Built by [`AsideBinding`](crate::aside::AsideBinding) after the
/// argument count has been checked, so the key positions are always in
/// bounds.
#[derive(Clone, Copy)]
pub struct Invocation<'a> {
    method: &'a str,
    args: &'a [Arc<dyn KeyComponent>],
    key_positions: &'a [usize],
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(
        method: &'a str,
        args: &'a [Arc<dyn KeyComponent>],
        key_positions: &'a [usize],
    ) -> Self {
        Self {
            method,
            args,
            key_positions,
        }
    }

    /// Name of the adapted method.
    pub fn method(&self) -> &str {
        self.method
    }

    /// All arguments in declaration order.
    pub fn args(&self) -> &[Arc<dyn KeyComponent>] {
        self.args
    }

    /// Key-marked argument positions, ascending.
    pub fn key_positions(&self) -> &[usize] {
        self.key_positions
    }

    /// The key-marked arguments in position order.
    pub fn key_args(&self) -> impl Iterator<Item = &Arc<dyn KeyComponent>> + '_ {
        self.key_positions.iter().map(|&position| &self.args[position])
    }
}

impl std::fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("method", &self.method)
            .field("args", &self.args.len())
            .field("key_positions", &self.key_positions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aside::key::component;

    #[test]
    fn key_args_follow_the_marked_positions() {
        let args = [
            component("tenant".to_string()),
            component(42u64),
            component(true),
        ];
        let invocation = Invocation::new("lookup", &args, &[0, 2]);

        assert_eq!(invocation.method(), "lookup");
        assert_eq!(invocation.args().len(), 3);

        let selected: Vec<_> = invocation.key_args().collect();
        assert_eq!(selected.len(), 2);
        assert!(selected[0].dyn_eq(component("tenant".to_string()).as_ref()));
        assert!(selected[1].dyn_eq(component(true).as_ref()));
    }

    #[test]
    fn no_positions_yields_no_key_args() {
        let args = [component(1u8)];
        let invocation = Invocation::new("tick", &args, &[]);
        assert_eq!(invocation.key_args().count(), 0);
    }
}
