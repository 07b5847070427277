// Copyright (c) 2021-2026 RBB S.r.l
// opensource@mintlayer.org
// SPDX-License-Identifier: MIT
// Licensed under the MIT License;
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://github.com/mintlayer/mintlayer-core/blob/master/LICENSE
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Declare a configuration value newtype with a default.
///
/// The generated type dereferences to the wrapped value and can be built from it, so config
/// structs can hold `Option`-free fields while still knowing their defaults:
///
/// ```
/// # use std::time::Duration;
/// utils::make_config_setting!(ReadTimeout, Duration, Duration::from_secs(10));
///
/// assert_eq!(*ReadTimeout::default(), Duration::from_secs(10));
/// assert_eq!(*ReadTimeout::from(Duration::from_secs(1)), Duration::from_secs(1));
/// assert_eq!(*ReadTimeout::from(None), Duration::from_secs(10));
/// ```
#[macro_export]
macro_rules! make_config_setting {
    ($name:ident, $tp:ty, $default:expr) => {
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name($tp);

        impl $name {
            pub fn new(value: $tp) -> Self {
                Self(value)
            }

            pub fn into_inner(self) -> $tp {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self($default)
            }
        }

        impl From<$tp> for $name {
            fn from(value: $tp) -> Self {
                Self(value)
            }
        }

        impl From<Option<$tp>> for $name {
            fn from(value: Option<$tp>) -> Self {
                value.map_or_else(Self::default, Self)
            }
        }

        impl std::ops::Deref for $name {
            type Target = $tp;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    };
}

#[cfg(test)]
mod tests {
    make_config_setting!(ServiceKey, String, "system".to_owned());
    make_config_setting!(ChunkSize, usize, 64 * 1024);

    #[test]
    fn defaults_and_overrides() {
        assert_eq!(ServiceKey::default().as_str(), "system");
        assert_eq!(*ChunkSize::default(), 65536);

        let key: ServiceKey = "svc".to_owned().into();
        assert_eq!(key.into_inner(), "svc");
        assert_eq!(*ChunkSize::new(10), 10);
        assert_eq!(*ChunkSize::from(None), 65536);
        assert_eq!(*ChunkSize::from(Some(5)), 5);
    }
}
