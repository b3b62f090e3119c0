use std::fmt;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

handle!(
    /// Linked vertex + fragment program owned by a `ShaderDevice`.
    ProgramId
);
handle!(
    /// Vertex data the device can bind to program inputs.
    BufferId
);
handle!(
    /// Binding of a buffer's components to a program's vertex inputs.
    VertexArrayId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_raw_id() {
        assert_eq!(ProgramId::new(7).to_string(), "#7");
        assert_eq!(BufferId::new(3).raw(), 3);
    }
}
