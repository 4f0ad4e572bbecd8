#[macro_use]
mod common;

#[cfg(test)]
mod scanning {
    tests! {
        unexpected_character in scanning is ERR(65)
        "[line 1] Error: Unexpected character."
    }

    tests! {
        unterminated_string in scanning is ERR(65)
        "[line 1] Error: Unterminated string."
    }
}
