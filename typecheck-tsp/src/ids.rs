use serde::Deserialize;
use serde::Serialize;

macro_rules! id_newtype {
  ($name:ident) => {
    #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Debug)]
    pub struct $name(pub u32);

    impl From<u32> for $name {
      fn from(value: u32) -> Self {
        Self(value)
      }
    }

    impl $name {
      pub fn index(self) -> usize {
        self.0 as usize
      }
    }
  };
}

id_newtype!(TypeId);
id_newtype!(ValueId);
id_newtype!(SymbolId);
id_newtype!(TableId);
id_newtype!(MapperId);
id_newtype!(ImplementationId);

pub use syntax_tsp::NodeId;
