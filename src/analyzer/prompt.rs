/// Instructions sent with every wallpaper
pub const COLOR_ANALYSIS_PROMPT: &str = r##"You are a professional UI/UX designer and artist with a strong background in color theory and accessibility guidelines. You are working on the theme for a desktop window manager, and need to design a gradient for when the attached image is set as the desktop wallpaper. Please design a gradient that will work well as the color for the focused window's border!

- Think about the mood of the image and how you can use the UI colors to enhance it.
- Apply your extensive knowledge of color theory to design the perfect gradient for this wallpaper.
- The most important task is to balance adequate contrast for readability with pleasing colors that are harmonious with the image's color palette.
- The "gradient_from" color must have adequate contrast as background for black text.
- Make sure all parts of the gradient pop against the background, especially at the top and the bottom of the image! Use colors that are at least somewhat vibrant because of this, avoid grays if possible.
- You can choose to use two similar colors for a subtle gradient, or distinct ones if the composition calls for it.
- The gradient direction should compliment the image, but keep in mind that the bottom and top of the image are the most important areas for contrast!
- Keep in mind that the colors should have enough contrast to be readable, but must not clash with the image's colors.

(Reminder: A gradient direction of 135 degrees goes from the top left to the bottom right, 180 degrees goes from top to bottom, etc.)

Reply only with a JSON object with the following format. Do not include any additional text or comments.

{"gradient_from": "#34495e", "gradient_to": "#456789", "gradient_angle": 45}"##;

/// Prompt text for one wallpaper, with its caption as extra context
pub fn build(title: &str, copyright: &str) -> String {
    let caption = match (title.trim(), copyright.trim()) {
        ("", "") => return COLOR_ANALYSIS_PROMPT.to_string(),
        (title, "") => title.to_string(),
        ("", copyright) => copyright.to_string(),
        (title, copyright) => format!("{title} ({copyright})"),
    };
    format!("Wallpaper: {caption}\n\n{COLOR_ANALYSIS_PROMPT}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_ends_with_example_object() {
        assert!(COLOR_ANALYSIS_PROMPT.ends_with(r##""gradient_angle": 45}"##));
    }

    #[test]
    fn test_caption_is_prefixed() {
        let prompt = build("Autumn in the mire", "Finland");
        assert!(prompt.starts_with("Wallpaper: Autumn in the mire (Finland)\n\n"));
        assert_eq!(build("", " "), COLOR_ANALYSIS_PROMPT);
    }
}
