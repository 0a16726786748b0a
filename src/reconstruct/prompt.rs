use crate::models::ObjectDescription;

/// Build the instruction sent alongside `image_count` images.
pub fn instruction(image_count: usize) -> String {
    let schema = schemars::schema_for!(ObjectDescription);
    let schema = serde_json::to_string_pretty(&schema).unwrap_or_default();

    format!(
        "You are a professional photogrammetry engine.
Analyze the {image_count} provided images of the object from different angles.

Your goal is to generate a 3D mesh that ACCURATELY matches the real-world object.

OUTPUT REQUIREMENT:
Return a single JSON document with \"shapeType\": \"complex\" and \"meshData\".
\"meshData.vertices\" is a flattened [x, y, z, ...] array; keep the vertex count below 500.
\"meshData.indices\" is a flattened array of triangle indices into that list.
Colours are hex strings such as \"#a0a0a0\". Metalness and roughness are between 0 and 1.

JSON SCHEMA:
{schema}

CRITICAL:
- Do NOT assume a generic primitive. Warped/organic shapes are expected.
- Scale the object so it fits within a 1x1x1 unit box.
- Use ALL images to infer depth and hidden sides.
"
    )
}
