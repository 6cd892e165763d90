// Copyright 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use alloy::primitives::U256;

/// Wei per whole ZTC.
const WEI_PER_TOKEN: u128 = 1_000_000_000_000_000_000;

/// Number of fractional digits shown in formatted amounts.
const DISPLAY_DECIMALS: u32 = 4;

/// Format wei as a human-readable ZTC amount with four decimals, rounding down.
pub fn format_ztc(wei: U256) -> String {
    let unit = U256::from(WEI_PER_TOKEN);
    let whole = wei / unit;
    let fraction = (wei % unit) / U256::from(10u128.pow(18 - DISPLAY_DECIMALS));

    format!(
        "{}.{:0width$} ZTC",
        format_with_commas_u256(whole),
        fraction.to::<u64>(),
        width = DISPLAY_DECIMALS as usize
    )
}

/// Format a U256 with thousand separators.
pub fn format_with_commas_u256(value: U256) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}
