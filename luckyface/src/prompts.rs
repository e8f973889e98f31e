/// Sent to the vision model along with the face crop.
pub const ANALYSIS_PROMPT: &str = "Analyze this person's facial features and expression, and provide:\n1. A lucky money suggestion based on their age range and appearance\n2. A fortune prediction or blessing that matches their expression\n3. Any special observations or recommendations\n\nPlease format the response in a structured way with clear sections.";

/// Shown locally when no face could be found. Never sent to the service.
pub const FALLBACK_PROMPT: &str = "I couldn't clearly see your face. Please:\n1. Make sure you're in good lighting\n2. Face the camera directly\n3. Remove any obstacles blocking your face\n4. Stay still for a moment\n\nLet's try again!";
